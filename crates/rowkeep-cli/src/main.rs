//! rowkeep binary: CRUD over the `users` table from the command line.
//!
//! Loads configuration, initializes structured logging, opens the pool,
//! ensures the schema, runs one command and prints the result as JSON.
//! Store failures follow the store's fallbacks and only show up in logs.

mod command;
mod config;

use std::process::ExitCode;

use rowkeep_db::{create_pool, ensure_schema, PoolError, SchemaError};
use rowkeep_store::{DbStore, Store};
use rowkeep_types::User;
use serde_json::{json, Value};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::command::{Command, Invocation, UsageError, USAGE};
use crate::config::{load_config, ConfigError, DatabaseConfig, LoggingConfig};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("failed to get database connection: {0}")]
    Connection(#[from] r2d2::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

fn resolve_config_path(flag: Option<String>) -> (String, &'static str) {
    if let Some(path) = flag.filter(|value| !value.trim().is_empty()) {
        return (path, "cli-arg");
    }

    if let Ok(path) = std::env::var("ROWKEEP_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("rowkeep.toml".to_string(), "default")
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn dispatch(store: &impl Store<User>, command: Command) -> Result<Value, serde_json::Error> {
    match command {
        Command::Add { login } => serde_json::to_value(store.add(User::new(login))),
        Command::List => serde_json::to_value(store.find_all()),
        Command::Get { id } => serde_json::to_value(store.find_by_id(id)),
        Command::Update { id, login } => {
            store.update(&User::with_id(id, login));
            serde_json::to_value(store.find_by_id(id))
        }
        Command::Delete { id } => {
            store.delete(id);
            Ok(json!({ "deleted": id }))
        }
    }
}

/// Opens the pool and makes sure the `users` table exists.
fn open_store(database: &DatabaseConfig) -> Result<DbStore, CliError> {
    let pool = create_pool(&database.path, database.runtime_settings())?;
    let conn = pool.get()?;
    ensure_schema(&conn)?;
    drop(conn);
    Ok(DbStore::new(pool))
}

fn run() -> Result<(), CliError> {
    let invocation = Invocation::parse(std::env::args().skip(1))?;
    let (config_path, config_source) = resolve_config_path(invocation.config_path);

    let config = load_config(Some(&config_path))?;
    init_tracing(&config.logging);

    tracing::debug!(
        source = config_source,
        path = %config_path,
        "resolved configuration path"
    );

    let store = open_store(&config.database)?;
    let output = dispatch(&store, invocation.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(e)) => {
            eprintln!("rowkeep: {e}\n\n{USAGE}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("rowkeep: {e}");
            ExitCode::FAILURE
        }
    }
}
