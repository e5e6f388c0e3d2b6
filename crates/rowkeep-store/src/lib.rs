//! CRUD store for rowkeep users.
//!
//! [`DbStore`] implements [`Store`] on top of [`rowkeep_db::Executor`]. Each
//! operation is one SQL statement plus a small closure over the prepared
//! statement. Failures never reach the caller: they are logged by the
//! executor and each operation falls back to a fixed default.
//!
//! | Operation | On failure |
//! |-----------|------------|
//! | `add` | user returned with its id still unset |
//! | `find_all` | empty list |
//! | `find_by_id` | `User::default()` |
//! | `update`, `delete` | no effect |

mod store;

pub use store::{DbStore, Store};
