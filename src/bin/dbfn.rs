//! Command line client: invokes a single operation against a PostgreSQL database.
//!
//! ```text
//! dbfn --shape table user_list 1 board_id=3
//! ```
//!
//! Arguments without `=` are positional, `name=value` arguments are named and must follow
//! the positional ones. Values are parsed as JSON when possible (`42`, `true`, `null`,
//! `"text"`), anything else is passed as text.

use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use log::{debug, error, info, warn};

use dbfunc::{
    dispatch::{Call, DispatchOptions, Dispatcher},
    params,
    provider::postgres::PgAccess,
    registry::{FilterRegistry, OverrideRegistry},
    types::{DataTable, Output, Shape, Value},
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(version, about = "Invoke a database function by name")]
struct Cli {
    /// Database connection url, defaults to `DBFUNC_DATABASE_URL`
    #[arg(long)]
    database_url: Option<String>,

    /// Schema of generic commands, defaults to `DBFUNC_SCHEMA`
    #[arg(long)]
    schema: Option<String>,

    /// Expand entity arguments into one parameter per field
    #[arg(long)]
    expand_entities: bool,

    /// Result shape: table, set, reader, scalar or query
    #[arg(long, short, default_value = "table")]
    shape: Shape,

    /// Operation name
    operation: String,

    /// Arguments, `value` or `name=value`
    args: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Null) => Value::Null,
        Ok(serde_json::Value::Bool(b)) => Value::Boolean(b),
        Ok(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Text(raw.to_owned())),
        },
        Ok(serde_json::Value::String(s)) => Value::Text(s),
        Ok(json) => Value::Json(json),
        Err(_) => Value::Text(raw.to_owned()),
    }
}

fn build_call(operation: &str, args: &[String]) -> Call {
    args.iter().fold(Call::new(operation), |call, raw| {
        match raw.split_once('=') {
            Some((name, value)) if !name.is_empty() => call.named(name, parse_value(value)),
            _ => call.arg(parse_value(raw)),
        }
    })
}

/// Database url without credentials, for logging.
fn redacted(database_url: &str) -> String {
    const INVALID: &str = "<invalid url>";

    let Ok(mut url) = url::Url::parse(database_url) else {
        return INVALID.to_owned();
    };

    if url.password().is_some() && url.set_password(Some("***")).is_err() {
        return INVALID.to_owned();
    }
    url.to_string()
}

/// Process configurables with command line overrides applied.
fn configurables(cli: &Cli) -> params::Configurables {
    let mut c = params::Configurables::from_env();

    if let Some(url) = &cli.database_url {
        c.database_url = Some(url.clone());
    }
    if let Some(schema) = &cli.schema {
        c.schema = Some(schema.clone());
    }
    c.expand_entities |= cli.expand_entities;
    c
}

fn print_table(table: &DataTable, json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string(table)?);
        return Ok(());
    }

    let header: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t").bold());

    for row in table.rows() {
        let cells = row
            .values()
            .iter()
            .map(serde_json::to_string)
            .collect::<serde_json::Result<Vec<_>>>()?;
        println!("{}", cells.join("\t"));
    }

    println!("{}", format!("({} rows)", table.row_count()).dimmed());
    Ok(())
}

fn print_output(output: Output, json: bool) -> serde_json::Result<()> {
    match output {
        Output::Table(table) => print_table(&table, json)?,
        Output::Set(set) => {
            for table in &set.tables {
                print_table(table, json)?;
            }
        }
        Output::Reader(reader) => {
            let mut table = DataTable::new(reader.columns().to_vec());
            for row in reader {
                table.push_row(row.into_values());
            }
            print_table(&table, json)?;
        }
        Output::Scalar(v) => println!("{}", serde_json::to_string(&v)?),
        Output::None => println!("{}", "ok".green()),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !params::init_configurables(configurables(&cli)) {
        warn!("configurables already initialized, command line overrides ignored");
    }

    let database_url = params::configurables()
        .database_url
        .clone()
        .ok_or("missing database url, use --database-url or DBFUNC_DATABASE_URL")?;
    info!("connecting to {}", redacted(&database_url));

    let db = Arc::new(PgAccess::connect(&database_url).await?);
    let dispatcher = Dispatcher::new(
        db,
        Arc::new(OverrideRegistry::new()),
        Arc::new(FilterRegistry::new()),
    )
    .with_options(DispatchOptions::from_configurables(params::configurables()));

    let call = build_call(&cli.operation, &cli.args);
    debug!("{:?}", call);

    let output = dispatcher.dispatch(cli.shape, call).await?;
    print_output(output, cli.json)?;

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{e}");
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
