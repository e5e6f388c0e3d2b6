//! Database core for rowkeep.
//!
//! Provides SQLite connection pooling (via `r2d2`), schema bootstrap, and the
//! parameterised statement executor that every store operation goes through.
//!
//! # Design decisions
//!
//! - **Closed parameter set**: values are bound through a [`Binder`] whose
//!   dispatch table maps each [`ParamKind`] to a binding function. The table
//!   is built once and only read afterwards, so it is shared across threads
//!   without locking.
//! - **Scoped resources**: a call acquires its own pooled connection and
//!   prepares its own statement. The statement borrows the connection, so it
//!   is always released first, and both are released on every exit path.
//! - **Absent on failure**: [`Executor::try_execute`] keeps the failure kind
//!   for callers that need it; [`Executor::execute`] and [`Executor::apply`]
//!   log the failure and collapse it to "did not happen".

mod binder;
mod error;
mod executor;
mod param;
mod pool;
mod schema;

pub use binder::{BindFn, Binder};
pub use error::{BindError, ErrorKind, ExecError};
pub use executor::{Executor, KeyMode, PreparedStatement};
pub use param::{ParamKind, Parameter};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use schema::{ensure_schema, SchemaError};
