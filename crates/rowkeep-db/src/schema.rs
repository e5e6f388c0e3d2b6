//! Table bootstrap.
//!
//! The schema is a single embedded SQL file applied with
//! `CREATE TABLE IF NOT EXISTS`, so running it again is a no-op.

use rusqlite::Connection;
use thiserror::Error;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Errors that can occur while creating the schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema SQL failed to execute.
    #[error("failed to apply schema: {0}")]
    Apply(#[from] rusqlite::Error),
}

/// Creates the `users` table if it does not exist yet.
///
/// # Errors
///
/// Returns `SchemaError::Apply` if the SQL cannot be executed.
pub fn ensure_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    tracing::debug!("schema ensured");
    Ok(())
}
