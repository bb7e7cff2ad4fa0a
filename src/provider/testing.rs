//! In-memory [`DbAccess`] used by the dispatcher tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{Command, CommandKind, DbAccess, Error, UnitOfWork};
use crate::types::{DataSet, DataTable, Parameters, RowReader, Shape, Value};

pub struct MockUnitOfWork {
    id: uuid::Uuid,
}

impl MockUnitOfWork {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
        }
    }
}

impl UnitOfWork for MockUnitOfWork {
    fn id(&self) -> uuid::Uuid {
        self.id
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// One execution seen by [`MockAccess`].
#[derive(Debug, Clone)]
pub struct Execution {
    pub shape: Shape,
    pub command: Command,
    pub unit_of_work: Option<uuid::Uuid>,
}

/// Provider returning canned results and recording every execution.
pub struct MockAccess {
    name: String,
    pub scalar: Value,
    pub table: DataTable,
    /// When set every execution fails with this message
    pub failure: Option<String>,
    executions: Mutex<Vec<Execution>>,
}

impl MockAccess {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            scalar: Value::Null,
            table: DataTable::empty(),
            failure: None,
            executions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_scalar(mut self, v: impl Into<Value>) -> Self {
        self.scalar = v.into();
        self
    }

    pub fn with_table(mut self, t: DataTable) -> Self {
        self.table = t;
        self
    }

    pub fn failing(mut self, msg: &str) -> Self {
        self.failure = Some(msg.to_owned());
        self
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.executions.lock().unwrap().clone()
    }

    fn record(
        &self,
        shape: Shape,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<(), Error> {
        self.executions.lock().unwrap().push(Execution {
            shape,
            command: cmd.clone(),
            unit_of_work: uow.map(|u| u.id()),
        });

        match &self.failure {
            Some(msg) => Err(Error::Execution(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DbAccess for MockAccess {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn build_command(
        &self,
        name: &str,
        is_stored_procedure: bool,
        parameters: Parameters,
    ) -> Result<Command, Error> {
        let kind = if is_stored_procedure {
            CommandKind::StoredProcedure
        } else {
            CommandKind::Text
        };
        Ok(Command::new(name, name.to_owned(), kind, parameters))
    }

    async fn fetch_table(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<DataTable, Error> {
        self.record(Shape::Table, cmd, uow)?;
        Ok(self.table.clone())
    }

    async fn fetch_set(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<DataSet, Error> {
        self.record(Shape::Set, cmd, uow)?;
        Ok(DataSet::new(vec![self.table.clone()]))
    }

    async fn fetch_reader(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<RowReader, Error> {
        self.record(Shape::Reader, cmd, uow)?;
        Ok(self.table.clone().into_reader())
    }

    async fn execute_scalar(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<Value, Error> {
        self.record(Shape::Scalar, cmd, uow)?;
        Ok(self.scalar.clone())
    }

    async fn execute_non_query(
        &self,
        cmd: &Command,
        uow: Option<&dyn UnitOfWork>,
    ) -> Result<u64, Error> {
        self.record(Shape::NonQuery, cmd, uow)?;
        Ok(1)
    }
}
