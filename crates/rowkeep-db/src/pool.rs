//! The pooled SQLite connections every executor call draws from.
//!
//! Each connection is set up the same way when the pool opens it: WAL
//! journaling, foreign keys, and the configured busy timeout. The executor
//! only ever calls `get()`; sizing lives here.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// The SQLite connection pool consumed by [`crate::Executor`].
pub type DbPool = Pool<SqliteConnectionManager>;

/// Per-connection and pool-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on open connections. Must be at least 1.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

impl DbRuntimeSettings {
    /// Rejects settings the pool builder cannot accept.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidSettings` for a zero `pool_max_size`.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.pool_max_size == 0 {
            return Err(PoolError::InvalidSettings(
                "pool_max_size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Errors raised while opening the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The runtime settings are unusable.
    #[error("invalid pool settings: {0}")]
    InvalidSettings(&'static str),

    /// r2d2 could not open the initial connections.
    #[error("failed to open database pool: {0}")]
    Build(#[from] r2d2::Error),
}

/// Opens a pool over the database at `db_path`.
///
/// `:memory:` is accepted, but each pooled connection then gets a private
/// database, so only a single-connection pool sees one consistent table.
///
/// # Errors
///
/// Returns `PoolError::InvalidSettings` before touching the file if
/// `settings` fail [`DbRuntimeSettings::validate`], and `PoolError::Build`
/// if the initial connections cannot be opened or configured.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    settings.validate()?;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| configure_connection(conn, &settings));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        max_size = settings.pool_max_size,
        busy_timeout_ms = settings.busy_timeout_ms,
        "opened database pool"
    );

    Ok(pool)
}

/// Applies journaling, foreign keys and the busy timeout to a new connection.
fn configure_connection(conn: &mut Connection, settings: &DbRuntimeSettings) -> rusqlite::Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    // "memory" is what in-memory databases report and cannot be changed.
    if !mode.eq_ignore_ascii_case("wal") && !mode.eq_ignore_ascii_case("memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {mode}, expected wal")),
        ));
    }

    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;
    Ok(())
}
