//! Parameter binding via a kind-keyed dispatch table.
//!
//! [`Binder::new`] registers one strategy per supported [`ParamKind`]. The
//! table is never mutated after construction; [`Binder::without`] returns a
//! new table instead.

use std::collections::HashMap;
use std::fmt;

use rusqlite::types::ToSql;
use rusqlite::Statement;

use crate::error::BindError;
use crate::param::{ParamKind, Parameter};

/// A binding strategy: binds `value` at the 1-based `position`.
pub type BindFn = fn(&mut Statement<'_>, usize, &Parameter) -> Result<(), BindError>;

/// Dispatch table from parameter kind to binding strategy.
#[derive(Clone)]
pub struct Binder {
    strategies: HashMap<ParamKind, BindFn>,
}

impl Binder {
    /// Builds the standard table: integer, text, real and blob.
    ///
    /// `Null` has no strategy, so binding it fails the call.
    pub fn new() -> Self {
        let mut strategies: HashMap<ParamKind, BindFn> = HashMap::new();
        strategies.insert(ParamKind::Integer, bind_integer);
        strategies.insert(ParamKind::Text, bind_text);
        strategies.insert(ParamKind::Real, bind_real);
        strategies.insert(ParamKind::Blob, bind_blob);
        Self { strategies }
    }

    /// Returns a copy of this table with the strategy for `kind` removed.
    pub fn without(&self, kind: ParamKind) -> Self {
        let mut strategies = self.strategies.clone();
        strategies.remove(&kind);
        Self { strategies }
    }

    /// Returns `true` if a strategy is registered for `kind`.
    pub fn supports(&self, kind: ParamKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Binds `value` at the 1-based `position` of `stmt`.
    ///
    /// # Errors
    ///
    /// Returns `BindError::Unsupported` if no strategy is registered for the
    /// value's kind, or `BindError::Driver` if SQLite rejects the bind (for
    /// example, a position past the last placeholder).
    pub fn bind(
        &self,
        stmt: &mut Statement<'_>,
        position: usize,
        value: &Parameter,
    ) -> Result<(), BindError> {
        let kind = value.kind();
        let strategy = self
            .strategies
            .get(&kind)
            .ok_or(BindError::Unsupported { position, kind })?;
        strategy(stmt, position, value)
    }

    /// Binds every parameter in declaration order, starting at position 1.
    ///
    /// # Errors
    ///
    /// Stops at the first parameter that fails to bind.
    pub fn bind_all(&self, stmt: &mut Statement<'_>, params: &[Parameter]) -> Result<(), BindError> {
        for (index, value) in params.iter().enumerate() {
            self.bind(stmt, index + 1, value)?;
        }
        Ok(())
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.strategies.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("Binder").field("kinds", &kinds).finish()
    }
}

fn bind_integer(stmt: &mut Statement<'_>, position: usize, value: &Parameter) -> Result<(), BindError> {
    match value {
        Parameter::Integer(v) => bind_raw(stmt, position, v),
        other => Err(mismatch(position, ParamKind::Integer, other)),
    }
}

fn bind_text(stmt: &mut Statement<'_>, position: usize, value: &Parameter) -> Result<(), BindError> {
    match value {
        Parameter::Text(v) => bind_raw(stmt, position, v),
        other => Err(mismatch(position, ParamKind::Text, other)),
    }
}

fn bind_real(stmt: &mut Statement<'_>, position: usize, value: &Parameter) -> Result<(), BindError> {
    match value {
        Parameter::Real(v) => bind_raw(stmt, position, v),
        other => Err(mismatch(position, ParamKind::Real, other)),
    }
}

fn bind_blob(stmt: &mut Statement<'_>, position: usize, value: &Parameter) -> Result<(), BindError> {
    match value {
        Parameter::Blob(v) => bind_raw(stmt, position, v),
        other => Err(mismatch(position, ParamKind::Blob, other)),
    }
}

fn bind_raw<T: ToSql>(stmt: &mut Statement<'_>, position: usize, value: T) -> Result<(), BindError> {
    stmt.raw_bind_parameter(position, value)
        .map_err(|source| BindError::Driver { position, source })
}

fn mismatch(position: usize, expected: ParamKind, found: &Parameter) -> BindError {
    BindError::Mismatch {
        position,
        expected,
        found: found.kind(),
    }
}
