//! Parameterised statement execution with scoped resources.
//!
//! Every call follows the same sequence: acquire a pooled connection,
//! prepare the SQL, bind the parameters in order, hand the live statement to
//! the caller's operation, then release the statement and the connection.
//! Nothing is cached between calls.

use std::fmt;

use rusqlite::{Connection, Row, Statement};

use crate::binder::Binder;
use crate::error::ExecError;
use crate::param::Parameter;
use crate::pool::DbPool;

/// Whether a statement should expose the key generated by an insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyMode {
    /// The statement returns nothing beyond its own result.
    #[default]
    NoGeneratedKeys,
    /// After execution, [`PreparedStatement::generated_key`] yields the
    /// auto-generated row identifier.
    ReturnGeneratedKeys,
}

/// A prepared, fully bound statement lent to an executor operation.
///
/// It borrows the pooled connection it was prepared on, so it cannot outlive
/// the call that created it.
pub struct PreparedStatement<'conn> {
    stmt: Statement<'conn>,
    conn: &'conn Connection,
    keys: KeyMode,
    generated: Option<i64>,
}

impl<'conn> PreparedStatement<'conn> {
    fn prepare(conn: &'conn Connection, sql: &str, keys: KeyMode) -> Result<Self, ExecError> {
        let stmt = conn.prepare(sql)?;
        Ok(Self {
            stmt,
            conn,
            keys,
            generated: None,
        })
    }

    /// Runs a statement that returns no rows and reports the changed row count.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::Statement` on constraint violations, or if the
    /// statement produces rows.
    pub fn execute_update(&mut self) -> Result<usize, ExecError> {
        // The rowid only moves when this statement inserted a row; updates
        // and deletes leave the previous insert's value in place.
        let rowid_before = self.conn.last_insert_rowid();
        let changed = self.stmt.raw_execute()?;
        let rowid_after = self.conn.last_insert_rowid();
        self.generated = (changed > 0 && rowid_after != rowid_before).then_some(rowid_after);
        Ok(changed)
    }

    /// Runs a query and maps every returned row.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::Statement` if stepping or mapping any row fails.
    pub fn query_map<T, F>(&mut self, mut f: F) -> Result<Vec<T>, ExecError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut rows = self.stmt.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(f(row)?);
        }
        Ok(out)
    }

    /// Runs a query and maps only the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::Statement` if stepping or mapping the row fails.
    pub fn query_first<T, F>(&mut self, f: F) -> Result<Option<T>, ExecError>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut rows = self.stmt.raw_query();
        match rows.next()? {
            Some(row) => Ok(Some(f(row)?)),
            None => Ok(None),
        }
    }

    /// Returns the identifier generated by the last [`execute_update`].
    ///
    /// `None` means the statement inserted nothing, which includes every
    /// update and delete.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::KeysNotRequested` unless the statement was
    /// prepared with [`KeyMode::ReturnGeneratedKeys`].
    ///
    /// [`execute_update`]: Self::execute_update
    pub fn generated_key(&self) -> Result<Option<i64>, ExecError> {
        if self.keys != KeyMode::ReturnGeneratedKeys {
            return Err(ExecError::KeysNotRequested);
        }
        Ok(self.generated)
    }
}

/// Runs parameterised SQL against pooled connections.
#[derive(Clone)]
pub struct Executor {
    pool: DbPool,
    binder: Binder,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.pool.state();
        f.debug_struct("Executor")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .field("binder", &self.binder)
            .finish()
    }
}

impl Executor {
    /// Creates an executor with the standard [`Binder`].
    pub fn new(pool: DbPool) -> Self {
        Self::with_binder(pool, Binder::new())
    }

    /// Creates an executor with a custom dispatch table.
    pub fn with_binder(pool: DbPool, binder: Binder) -> Self {
        Self { pool, binder }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Executes `sql` and returns the operation's result, keeping the error.
    ///
    /// The parameter count must match the statement's placeholder count.
    /// The statement is dropped before the connection returns to the pool,
    /// whether or not `operation` succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ExecError` for connection, preparation, binding, or execution
    /// failures, and whatever `operation` returns.
    pub fn try_execute<R, F>(
        &self,
        sql: &str,
        params: &[Parameter],
        keys: KeyMode,
        operation: F,
    ) -> Result<R, ExecError>
    where
        F: FnOnce(&mut PreparedStatement<'_>) -> Result<R, ExecError>,
    {
        tracing::debug!(sql, params = params.len(), ?keys, "executing statement");

        let conn = self.pool.get()?;
        let outcome = self.run_on(&conn, sql, params, keys, operation);
        drop(conn);
        tracing::trace!(sql, "connection returned to pool");

        outcome
    }

    fn run_on<R, F>(
        &self,
        conn: &Connection,
        sql: &str,
        params: &[Parameter],
        keys: KeyMode,
        operation: F,
    ) -> Result<R, ExecError>
    where
        F: FnOnce(&mut PreparedStatement<'_>) -> Result<R, ExecError>,
    {
        let mut statement = PreparedStatement::prepare(conn, sql, keys)?;

        let expected = statement.stmt.parameter_count();
        if expected != params.len() {
            return Err(ExecError::ParameterCount {
                expected,
                found: params.len(),
            });
        }

        self.binder.bind_all(&mut statement.stmt, params)?;
        operation(&mut statement)
    }

    /// Executes `sql` without generated keys; `None` if anything failed.
    pub fn execute<R, F>(&self, sql: &str, params: &[Parameter], operation: F) -> Option<R>
    where
        F: FnOnce(&mut PreparedStatement<'_>) -> Result<R, ExecError>,
    {
        self.execute_with(sql, params, KeyMode::default(), operation)
    }

    /// Executes `sql` in the given key mode; `None` if anything failed.
    ///
    /// Failures are logged at `warn` with their kind and never returned.
    pub fn execute_with<R, F>(
        &self,
        sql: &str,
        params: &[Parameter],
        keys: KeyMode,
        operation: F,
    ) -> Option<R>
    where
        F: FnOnce(&mut PreparedStatement<'_>) -> Result<R, ExecError>,
    {
        match self.try_execute(sql, params, keys, operation) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(sql, kind = ?error.kind(), %error, "statement execution failed");
                None
            }
        }
    }

    /// Side-effect form of [`execute`](Self::execute).
    pub fn apply<F>(&self, sql: &str, params: &[Parameter], operation: F)
    where
        F: FnOnce(&mut PreparedStatement<'_>) -> Result<(), ExecError>,
    {
        self.apply_with(sql, params, KeyMode::default(), operation);
    }

    /// Side-effect form of [`execute_with`](Self::execute_with).
    pub fn apply_with<F>(&self, sql: &str, params: &[Parameter], keys: KeyMode, operation: F)
    where
        F: FnOnce(&mut PreparedStatement<'_>) -> Result<(), ExecError>,
    {
        let _ = self.execute_with(sql, params, keys, |statement| {
            operation(statement)?;
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::param::ParamKind;
    use crate::pool::{create_pool, DbRuntimeSettings};
    use crate::schema::ensure_schema;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Collects formatted log output for assertions.
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedWriter {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?
                .extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_executor(pool_max_size: u32) -> (TempDir, Executor) {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("exec.db");
        let settings = DbRuntimeSettings {
            pool_max_size,
            ..DbRuntimeSettings::default()
        };
        let pool = create_pool(path.to_str().expect("utf-8 path"), settings)
            .expect("pool creation should succeed");
        ensure_schema(&pool.get().expect("should get connection")).expect("schema should apply");
        (dir, Executor::new(pool))
    }

    fn insert(executor: &Executor, login: &str) -> i64 {
        executor
            .try_execute(
                "insert into users (login) values (?)",
                &[Parameter::from(login)],
                KeyMode::ReturnGeneratedKeys,
                |ps| {
                    ps.execute_update()?;
                    ps.generated_key()
                },
            )
            .expect("insert should succeed")
            .expect("insert should generate a key")
    }

    #[test]
    fn generated_key_is_the_new_row_id() {
        let (_dir, executor) = test_executor(2);

        let first = insert(&executor, "alice");
        let second = insert(&executor, "bob");

        assert!(first > 0);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn generated_key_requires_key_mode() {
        let (_dir, executor) = test_executor(2);

        let err = executor
            .try_execute(
                "insert into users (login) values (?)",
                &[Parameter::from("alice")],
                KeyMode::NoGeneratedKeys,
                |ps| {
                    ps.execute_update()?;
                    ps.generated_key()
                },
            )
            .expect_err("keys were not requested");

        assert!(matches!(err, ExecError::KeysNotRequested));
        assert_eq!(err.kind(), ErrorKind::Statement);
    }

    #[test]
    fn generated_key_is_none_when_nothing_changed() {
        let (_dir, executor) = test_executor(2);

        let key = executor
            .try_execute(
                "update users set login = ? where id = ?",
                &[Parameter::from("ghost"), Parameter::Integer(99)],
                KeyMode::ReturnGeneratedKeys,
                |ps| {
                    ps.execute_update()?;
                    ps.generated_key()
                },
            )
            .expect("update of a missing row still succeeds");

        assert_eq!(key, None);
    }

    #[test]
    fn update_and_delete_never_report_an_earlier_insert_key() {
        // One connection, so the earlier insert's rowid is still on it.
        let (_dir, executor) = test_executor(1);
        let id = insert(&executor, "alice");

        let keys: Vec<Option<i64>> = [
            (
                "update users set login = ? where id = ?",
                vec![Parameter::from("alicia"), Parameter::Integer(id)],
            ),
            (
                "delete from users where id = ?",
                vec![Parameter::Integer(id)],
            ),
        ]
        .into_iter()
        .map(|(sql, params)| {
            executor
                .try_execute(sql, &params, KeyMode::ReturnGeneratedKeys, |ps| {
                    let changed = ps.execute_update()?;
                    assert_eq!(changed, 1, "{sql} should touch the row");
                    ps.generated_key()
                })
                .expect("statement should succeed")
        })
        .collect();

        assert_eq!(keys, vec![None, None]);
        assert_eq!(insert(&executor, "bob"), id + 1, "inserts still report their key");
    }

    #[test]
    fn query_sees_bound_parameters() {
        let (_dir, executor) = test_executor(2);
        let id = insert(&executor, "alice");

        let login = executor.execute(
            "select login from users where id = ?",
            &[Parameter::Integer(id)],
            |ps| ps.query_first(|row| row.get::<_, String>(0)),
        );

        assert_eq!(login, Some(Some("alice".to_string())));
    }

    #[test]
    fn null_parameter_is_a_binding_failure() {
        let (_dir, executor) = test_executor(2);

        let err = executor
            .try_execute(
                "insert into users (login) values (?)",
                &[Parameter::Null],
                KeyMode::NoGeneratedKeys,
                |ps| ps.execute_update(),
            )
            .expect_err("null must not bind");
        assert_eq!(err.kind(), ErrorKind::Binding);

        let absent = executor.execute(
            "insert into users (login) values (?)",
            &[Parameter::Null],
            |ps| ps.execute_update(),
        );
        assert_eq!(absent, None);
    }

    #[test]
    fn binding_failure_is_logged_with_its_kind() {
        let (_dir, executor) = test_executor(2);
        let buf = Arc::new(Mutex::new(Vec::new()));
        let writer_buf = Arc::clone(&buf);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || SharedWriter(Arc::clone(&writer_buf)))
            .finish();

        let outcome = tracing::subscriber::with_default(subscriber, || {
            executor.execute(
                "insert into users (login) values (?)",
                &[Parameter::Null],
                |ps| ps.execute_update(),
            )
        });

        assert_eq!(outcome, None);
        let logged = String::from_utf8(buf.lock().expect("log buffer lock").clone())
            .expect("log output should be utf-8");
        let line = logged
            .lines()
            .find(|line| line.contains("statement execution failed"))
            .unwrap_or_else(|| panic!("no failure event in log output: {logged:?}"));
        assert!(line.contains("WARN"), "unexpected level: {line}");
        assert!(line.contains("kind=Binding"), "missing kind: {line}");
    }

    #[test]
    fn custom_binder_rejects_removed_kind() {
        let (_dir, executor) = test_executor(2);
        let restricted =
            Executor::with_binder(executor.pool().clone(), Binder::new().without(ParamKind::Text));

        let err = restricted
            .try_execute(
                "insert into users (login) values (?)",
                &[Parameter::from("alice")],
                KeyMode::NoGeneratedKeys,
                |ps| ps.execute_update(),
            )
            .expect_err("text strategy was removed");

        assert_eq!(err.kind(), ErrorKind::Binding);
    }

    #[test]
    fn malformed_sql_is_a_statement_failure() {
        let (_dir, executor) = test_executor(2);

        let err = executor
            .try_execute("selec nothing", &[], KeyMode::NoGeneratedKeys, |ps| {
                ps.execute_update()
            })
            .expect_err("sql is malformed");

        assert!(matches!(err, ExecError::Statement(_)));
        assert_eq!(err.kind(), ErrorKind::Statement);
    }

    #[test]
    fn constraint_violation_is_a_statement_failure() {
        let (_dir, executor) = test_executor(2);

        let err = executor
            .try_execute(
                "insert into users (id, login) values (?, ?)",
                &[Parameter::Integer(1), Parameter::from("a")],
                KeyMode::NoGeneratedKeys,
                |ps| ps.execute_update(),
            )
            .and_then(|_| {
                executor.try_execute(
                    "insert into users (id, login) values (?, ?)",
                    &[Parameter::Integer(1), Parameter::from("b")],
                    KeyMode::NoGeneratedKeys,
                    |ps| ps.execute_update(),
                )
            })
            .expect_err("duplicate primary key");

        assert_eq!(err.kind(), ErrorKind::Statement);
    }

    #[test]
    fn parameter_count_must_match_placeholders() {
        let (_dir, executor) = test_executor(2);

        let err = executor
            .try_execute(
                "update users set login = ? where id = ?",
                &[Parameter::from("only one")],
                KeyMode::NoGeneratedKeys,
                |ps| ps.execute_update(),
            )
            .expect_err("one parameter is missing");

        assert!(matches!(
            err,
            ExecError::ParameterCount {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn unreachable_database_is_a_connectivity_failure() {
        let manager = r2d2_sqlite::SqliteConnectionManager::file("/nonexistent-dir/rowkeep.db")
            .with_flags(rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE);
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_millis(200))
            .build_unchecked(manager);
        let executor = Executor::new(pool);

        let err = executor
            .try_execute("select 1", &[], KeyMode::NoGeneratedKeys, |ps| {
                ps.query_first(|row| row.get::<_, i64>(0))
            })
            .expect_err("no connection can be opened");

        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert_eq!(
            executor.execute("select 1", &[], |ps| ps.query_first(|row| row.get::<_, i64>(0))),
            None
        );
    }

    #[test]
    fn failing_operation_still_returns_connection() {
        let (_dir, executor) = test_executor(1);

        for _ in 0..3 {
            let outcome: Result<(), ExecError> = executor.try_execute(
                "select 1",
                &[],
                KeyMode::NoGeneratedKeys,
                |_| Err(ExecError::KeysNotRequested),
            );
            assert!(outcome.is_err());
        }

        let state = executor.pool().state();
        assert_eq!(state.connections, 1);
        assert_eq!(state.idle_connections, 1, "the only connection must be idle again");
    }

    #[test]
    fn apply_swallows_failures() {
        let (_dir, executor) = test_executor(2);

        executor.apply("delete from missing_table where id = ?", &[Parameter::Integer(1)], |ps| {
            ps.execute_update().map(|_| ())
        });

        executor.apply_with(
            "insert into users (login) values (?)",
            &[Parameter::from("kept")],
            KeyMode::ReturnGeneratedKeys,
            |ps| ps.execute_update().map(|_| ()),
        );

        let count = executor.execute("select count(*) from users", &[], |ps| {
            ps.query_first(|row| row.get::<_, i64>(0))
        });
        assert_eq!(count, Some(Some(1)));
    }
}
