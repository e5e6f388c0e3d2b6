//! Shared record types for rowkeep.
//!
//! The only persisted entity is [`User`]. Its identifier is assigned by the
//! store on the first successful insert; until then it holds [`UNSET_ID`].

use serde::{Deserialize, Serialize};

/// Identifier carried by a record that has never been persisted.
pub const UNSET_ID: i64 = 0;

/// A row of the `users` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, [`UNSET_ID`] before the first insert.
    pub id: i64,
    /// Display name.
    pub login: String,
}

impl User {
    /// Creates an unpersisted user with the given login.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            id: UNSET_ID,
            login: login.into(),
        }
    }

    /// Creates a user as reconstructed from a stored row.
    pub fn with_id(id: i64, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
        }
    }

    /// Returns `true` once the store has assigned an identifier.
    pub fn is_persisted(&self) -> bool {
        self.id != UNSET_ID
    }

    /// Returns `true` for the "empty" user returned when a lookup misses.
    pub fn is_unset(&self) -> bool {
        self.id == UNSET_ID && self.login.is_empty()
    }
}
