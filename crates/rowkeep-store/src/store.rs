//! The `users` table store.

use rowkeep_db::{DbPool, Executor, KeyMode, Parameter};
use rowkeep_types::User;
use rusqlite::Row;

const INSERT_USER: &str = "insert into users (login) values (?)";
const SELECT_USERS: &str = "select * from users";
const SELECT_USER_BY_ID: &str = "select * from users where id=?";
const UPDATE_USER: &str = "update users set login=? where id=?";
const DELETE_USER: &str = "delete from users where id=?";

/// Storage operations for a model type.
pub trait Store<T> {
    /// Persists `model` and returns it with its assigned identifier.
    fn add(&self, model: T) -> T;

    /// Returns every stored model.
    fn find_all(&self) -> Vec<T>;

    /// Overwrites the stored fields of the model with `model`'s identifier.
    fn update(&self, model: &T);

    /// Removes the model with the given identifier, if any.
    fn delete(&self, id: i64);

    /// Returns the model with the given identifier, or the empty model.
    fn find_by_id(&self, id: i64) -> T;
}

/// SQLite-backed [`Store`] for [`User`].
#[derive(Debug, Clone)]
pub struct DbStore {
    executor: Executor,
}

impl DbStore {
    /// Creates a store over `pool` with the standard parameter binder.
    pub fn new(pool: DbPool) -> Self {
        Self::with_executor(Executor::new(pool))
    }

    /// Creates a store over an existing executor.
    pub fn with_executor(executor: Executor) -> Self {
        Self { executor }
    }

    /// Returns the executor backing this store.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

impl Store<User> for DbStore {
    fn add(&self, mut user: User) -> User {
        let key = self.executor.execute_with(
            INSERT_USER,
            &[Parameter::from(user.login.as_str())],
            KeyMode::ReturnGeneratedKeys,
            |ps| {
                ps.execute_update()?;
                ps.generated_key()
            },
        );
        if let Some(Some(id)) = key {
            user.id = id;
        }
        user
    }

    fn find_all(&self) -> Vec<User> {
        self.executor
            .execute(SELECT_USERS, &[], |ps| ps.query_map(map_row_to_user))
            .unwrap_or_default()
    }

    fn update(&self, user: &User) {
        self.executor.apply(
            UPDATE_USER,
            &[Parameter::from(user.login.as_str()), Parameter::Integer(user.id)],
            |ps| {
                let changed = ps.execute_update()?;
                if changed == 0 {
                    tracing::debug!(id = user.id, "update matched no user");
                }
                Ok(())
            },
        );
    }

    fn delete(&self, id: i64) {
        self.executor
            .apply(DELETE_USER, &[Parameter::Integer(id)], |ps| {
                ps.execute_update().map(|_| ())
            });
    }

    fn find_by_id(&self, id: i64) -> User {
        self.executor
            .execute(SELECT_USER_BY_ID, &[Parameter::Integer(id)], |ps| {
                ps.query_first(map_row_to_user)
            })
            .flatten()
            .unwrap_or_default()
    }
}

fn map_row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User::with_id(row.get("id")?, row.get::<_, String>("login")?))
}
