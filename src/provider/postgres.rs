//! PostgreSQL implementation of [`DbAccess`].
//!
//! Generic commands are routine calls. Given the operation `get_user` with parameters
//! `[("", 3), ("board_id", 9)]` the provider renders
//!
//! ```text
//! "public"."yaf_get_user"($1, "board_id" => $2)
//! ```
//!
//! which is then wrapped in `SELECT * FROM ...` for the row-producing shapes and in
//! `SELECT ...` for scalar and non-query executions.
//!
//! Values are bound with a fixed type per variant: integers as `int4` (or `int8` when
//! they do not fit), floats as `float8`, text as `text`. Routine resolution only applies
//! implicit casts, so a routine taking `smallint`, `real` or `numeric` arguments is not
//! found from these binds; such routines need an override or a `text` wrapper.
//!
//! Results with no rows still carry their columns, taken from the statement description
//! at the cost of one extra round trip.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use log::{debug, trace};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as _, Executor, Postgres, Row, Transaction, TypeInfo};
use tokio::sync::Mutex;

use super::{Command, CommandKind, DbAccess, Error, UnitOfWork};
use crate::params;
use crate::types::{Column, DataSet, DataTable, Parameters, RowReader, Value};

pub const PROVIDER_NAME: &str = "postgres";

/// Naming rules applied to generic command names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgCommandConfig {
    /// Schema used when the command name is not already qualified
    pub schema: Option<String>,
    /// Prefix prepended to every routine name
    pub object_qualifier: String,
}

impl PgCommandConfig {
    pub fn from_configurables(c: &params::Configurables) -> Self {
        Self {
            schema: c.schema.clone(),
            object_qualifier: c.object_qualifier.clone(),
        }
    }
}

pub struct PgAccess {
    pool: PgPool,
    config: PgCommandConfig,
}

impl PgAccess {
    pub fn new(pool: PgPool, config: PgCommandConfig) -> Self {
        Self { pool, config }
    }

    /// Opens a pool on `database_url` using the process configurables.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let c = params::configurables();

        let pool = PgPoolOptions::new()
            .max_connections(c.max_connections)
            .acquire_timeout(c.acquire_timeout)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, PgCommandConfig::from_configurables(c)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Starts a new transaction usable as a unit of work on this provider.
    pub async fn begin(&self) -> Result<Arc<PgUnitOfWork>, Error> {
        let tx = self.pool.begin().await?;
        let uow = PgUnitOfWork {
            id: uuid::Uuid::new_v4(),
            tx: Mutex::new(Some(tx)),
        };
        debug!("unit of work {} started", uow.id);
        Ok(Arc::new(uow))
    }

    /// Fully qualified and quoted routine name.
    fn routine_name(&self, name: &str) -> Result<String, Error> {
        let mut parts: Vec<&str> = name.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) || parts.len() > 2 {
            return Err(Error::InvalidCommand {
                name: name.to_owned(),
                msg: "expected `routine` or `schema.routine`".to_owned(),
            });
        }

        // `parts` is ensured to contain at least one element (previous check)
        let routine = format!("{}{}", self.config.object_qualifier, parts.pop().unwrap_or(name));
        let schema = parts.pop().or(self.config.schema.as_deref());

        Ok(match schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&routine)),
            None => quote_ident(&routine),
        })
    }

    fn routine_call(&self, name: &str, parameters: &Parameters) -> Result<String, Error> {
        let mut args = Vec::with_capacity(parameters.len());
        let mut placeholder = 0;
        let mut seen_named = false;

        for p in parameters {
            // NULL is rendered as a keyword so that the database can infer its type from the
            // routine signature. No user data ever reaches the command text.
            let arg = if p.value.is_null() {
                "NULL".to_owned()
            } else {
                placeholder += 1;
                format!("${placeholder}")
            };

            if p.is_named() {
                seen_named = true;
                args.push(format!("{} => {}", quote_ident(&p.name), arg));
            } else {
                if seen_named {
                    return Err(Error::InvalidCommand {
                        name: name.to_owned(),
                        msg: "positional argument after a named one".to_owned(),
                    });
                }
                args.push(arg);
            }
        }

        Ok(format!("{}({})", self.routine_name(name)?, args.join(", ")))
    }

    async fn fetch_rows(
        &self,
        sql: &str,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<DataTable, Error> {
        trace!("fetching rows: {}", sql);

        let query = bind_all(sqlx::query(sql), &cmd.parameters)?;

        match uow {
            Some(uow) => {
                let uow = PgUnitOfWork::downcast(uow)?;
                let mut guard = uow.tx.lock().await;
                let tx = guard.as_mut().ok_or(Error::UnitOfWorkCompleted)?;
                let rows: Vec<PgRow> = query.fetch(&mut **tx).try_collect().await?;
                if rows.is_empty() {
                    return describe_table(&mut **tx, sql).await;
                }
                rows_to_table(&rows)
            }
            None => {
                let rows: Vec<PgRow> = query.fetch(&self.pool).try_collect().await?;
                if rows.is_empty() {
                    return describe_table(&self.pool, sql).await;
                }
                rows_to_table(&rows)
            }
        }
    }

    fn statement(&self, cmd: &Command, returns_rows: bool) -> String {
        match (cmd.kind, returns_rows) {
            (CommandKind::Text, _) => cmd.text.clone(),
            (CommandKind::StoredProcedure, true) => format!("SELECT * FROM {}", cmd.text),
            (CommandKind::StoredProcedure, false) => format!("SELECT {}", cmd.text),
        }
    }
}

#[async_trait]
impl DbAccess for PgAccess {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn build_command(
        &self,
        name: &str,
        is_stored_procedure: bool,
        parameters: Parameters,
    ) -> Result<Command, Error> {
        if is_stored_procedure {
            let text = self.routine_call(name, &parameters)?;
            Ok(Command::new(name, text, CommandKind::StoredProcedure, parameters))
        } else {
            Ok(Command::new(name, name.to_owned(), CommandKind::Text, parameters))
        }
    }

    async fn fetch_table(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<DataTable, Error> {
        self.fetch_rows(&self.statement(cmd, true), cmd, uow).await
    }

    /// Routines return a single result, the data set always holds one table.
    async fn fetch_set(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<DataSet, Error> {
        let table = self.fetch_rows(&self.statement(cmd, true), cmd, uow).await?;
        Ok(DataSet::new(vec![table]))
    }

    async fn fetch_reader(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<RowReader, Error> {
        let table = self.fetch_rows(&self.statement(cmd, true), cmd, uow).await?;
        Ok(table.into_reader())
    }

    async fn execute_scalar(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<Value, Error> {
        let table = self.fetch_rows(&self.statement(cmd, false), cmd, uow).await?;
        Ok(table.first_value().cloned().unwrap_or_default())
    }

    async fn execute_non_query(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<u64, Error> {
        let sql = self.statement(cmd, false);
        trace!("executing: {}", sql);

        let query = bind_all(sqlx::query(&sql), &cmd.parameters)?;

        let res = match uow {
            Some(uow) => {
                let uow = PgUnitOfWork::downcast(uow)?;
                let mut guard = uow.tx.lock().await;
                let tx = guard.as_mut().ok_or(Error::UnitOfWorkCompleted)?;
                query.execute(&mut **tx).await?
            }
            None => query.execute(&self.pool).await?,
        };

        Ok(res.rows_affected())
    }
}

/// A PostgreSQL transaction used as unit of work.
///
/// The transaction is rolled back if the unit of work is dropped before being committed.
pub struct PgUnitOfWork {
    id: uuid::Uuid,
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PgUnitOfWork {
    fn downcast(uow: &dyn UnitOfWork) -> Result<&Self, Error> {
        uow.as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| Error::ForeignUnitOfWork(PROVIDER_NAME.to_owned()))
    }

    pub async fn commit(&self) -> Result<(), Error> {
        let tx = self.tx.lock().await.take().ok_or(Error::UnitOfWorkCompleted)?;
        tx.commit().await?;
        debug!("unit of work {} committed", self.id);
        Ok(())
    }

    pub async fn rollback(&self) -> Result<(), Error> {
        let tx = self.tx.lock().await.take().ok_or(Error::UnitOfWorkCompleted)?;
        tx.rollback().await?;
        debug!("unit of work {} rolled back", self.id);
        Ok(())
    }
}

impl UnitOfWork for PgUnitOfWork {
    fn id(&self) -> uuid::Uuid {
        self.id
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Double quotes an identifier, escaping embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn bind_all<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    parameters: &'q Parameters,
) -> Result<Query<'q, Postgres, PgArguments>, Error> {
    for p in parameters {
        q = match &p.value {
            // rendered as a keyword, see `routine_call`
            Value::Null => q,
            Value::Boolean(v) => q.bind(*v),
            // Integers that fit are sent as INT4: PostgreSQL implicitly widens INT4 to INT8
            // when resolving a routine, never the other way around.
            Value::Integer(v) => match i32::try_from(*v) {
                Ok(small) => q.bind(small),
                Err(_) => q.bind(*v),
            },
            Value::Float(v) => q.bind(*v),
            Value::Text(v) => q.bind(v.as_str()),
            Value::Bytes(v) => q.bind(v.as_slice()),
            Value::Uuid(v) => q.bind(*v),
            Value::Timestamp(v) => q.bind(*v),
            Value::Json(v) => q.bind(sqlx::types::Json(v)),
            Value::Entity(_) => return Err(Error::UnsupportedValue(p.value.kind())),
        };
    }
    Ok(q)
}

/// Empty table with the columns the server reports for `sql`.
async fn describe_table<'c, E>(executor: E, sql: &str) -> Result<DataTable, Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let describe = executor.describe(sql).await?;
    let columns = describe
        .columns()
        .iter()
        .map(|c| Column::new(c.name(), c.type_info().name()))
        .collect();

    Ok(DataTable::new(columns))
}

fn rows_to_table(rows: &[PgRow]) -> Result<DataTable, Error> {
    let Some(first) = rows.first() else {
        return Ok(DataTable::empty());
    };

    let columns = first
        .columns()
        .iter()
        .map(|c| Column::new(c.name(), c.type_info().name()))
        .collect::<Vec<_>>();

    let mut table = DataTable::new(columns);
    for row in rows {
        table.push_row(decode_row(row)?);
    }

    Ok(table)
}

fn decode_row(row: &PgRow) -> Result<Vec<Value>, Error> {
    row.columns()
        .iter()
        .map(|c| decode_cell(row, c.ordinal(), c.name(), c.type_info().name()))
        .collect()
}

fn decode_cell(row: &PgRow, i: usize, column: &str, type_name: &str) -> Result<Value, Error> {
    let value = match type_name {
        "VOID" => Value::Null,
        "BOOL" => row.try_get::<Option<bool>, _>(i)?.into(),
        "INT2" => row.try_get::<Option<i16>, _>(i)?.map(i64::from).into(),
        "INT4" => row.try_get::<Option<i32>, _>(i)?.map(i64::from).into(),
        "INT8" => row.try_get::<Option<i64>, _>(i)?.into(),
        "FLOAT4" => row.try_get::<Option<f32>, _>(i)?.map(f64::from).into(),
        "FLOAT8" => row.try_get::<Option<f64>, _>(i)?.into(),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<Option<String>, _>(i)?.into(),
        "UUID" => row.try_get::<Option<uuid::Uuid>, _>(i)?.into(),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)?
            .into(),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(i)?
            .map(|t| t.and_utc())
            .into(),
        "JSON" | "JSONB" => row.try_get::<Option<serde_json::Value>, _>(i)?.into(),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(i)?.into(),
        _ => {
            return Err(Error::Decode {
                column: column.to_owned(),
                type_name: type_name.to_owned(),
            });
        }
    };
    Ok(value)
}
