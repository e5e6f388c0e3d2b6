//! Error types for parameter binding and statement execution.

use thiserror::Error;

use crate::param::ParamKind;

/// Errors raised while binding a parameter to a placeholder.
#[derive(Debug, Error)]
pub enum BindError {
    /// No strategy is registered for the value's kind.
    #[error("no binding strategy for {kind} parameter at position {position}")]
    Unsupported {
        /// 1-based placeholder position.
        position: usize,
        /// Kind of the rejected value.
        kind: ParamKind,
    },

    /// A strategy was handed a value of another kind.
    #[error("{expected} strategy cannot bind {found} value at position {position}")]
    Mismatch {
        position: usize,
        expected: ParamKind,
        found: ParamKind,
    },

    /// The driver rejected the bind call.
    #[error("failed to bind parameter at position {position}: {source}")]
    Driver {
        position: usize,
        source: rusqlite::Error,
    },
}

/// The failure taxonomy of a single executor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parameter could not be bound.
    Binding,
    /// No connection could be acquired from the pool.
    Connectivity,
    /// Preparing or executing the statement failed.
    Statement,
}

/// Errors that can end an executor call.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The pool could not supply a connection.
    #[error("failed to acquire database connection: {0}")]
    Connectivity(#[from] r2d2::Error),

    /// A parameter could not be bound.
    #[error(transparent)]
    Binding(#[from] BindError),

    /// SQLite rejected the statement or failed to run it.
    #[error("statement failed: {0}")]
    Statement(#[from] rusqlite::Error),

    /// The parameter list does not cover the statement's placeholders.
    #[error("statement expects {expected} parameters, got {found}")]
    ParameterCount { expected: usize, found: usize },

    /// Generated keys were read from a statement prepared without them.
    #[error("generated keys were not requested for this statement")]
    KeysNotRequested,
}

impl ExecError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Binding(_) => ErrorKind::Binding,
            Self::Statement(_) | Self::ParameterCount { .. } | Self::KeysNotRequested => {
                ErrorKind::Statement
            }
        }
    }
}
