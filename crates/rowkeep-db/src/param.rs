//! Typed statement parameters.

use std::fmt;

/// A value bound to a positional `?` placeholder.
///
/// Parameters bind in slice order: the first one goes to placeholder 1.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// 64-bit signed integer.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
    /// 64-bit float.
    Real(f64),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// SQL `NULL`. No binding strategy accepts it.
    Null,
}

/// The tag of a [`Parameter`], used as the binder's dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Integer,
    Text,
    Real,
    Blob,
    Null,
}

impl Parameter {
    /// Returns the dispatch key for this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Integer(_) => ParamKind::Integer,
            Self::Text(_) => ParamKind::Text,
            Self::Real(_) => ParamKind::Real,
            Self::Blob(_) => ParamKind::Blob,
            Self::Null => ParamKind::Null,
        }
    }
}

impl ParamKind {
    /// Returns the lowercase name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Real => "real",
            Self::Blob => "blob",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<i64> for Parameter {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Parameter {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for Parameter {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Parameter {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<Vec<u8>> for Parameter {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_the_matching_kind() {
        assert_eq!(Parameter::from(7_i64).kind(), ParamKind::Integer);
        assert_eq!(Parameter::from(7_i32), Parameter::Integer(7));
        assert_eq!(Parameter::from("alice"), Parameter::Text("alice".into()));
        assert_eq!(Parameter::from(String::from("bob")).kind(), ParamKind::Text);
        assert_eq!(Parameter::from(1.5_f64).kind(), ParamKind::Real);
        assert_eq!(Parameter::from(vec![1_u8, 2]).kind(), ParamKind::Blob);
    }

    #[test]
    fn none_becomes_null() {
        assert_eq!(Parameter::from(None::<i64>), Parameter::Null);
        assert_eq!(Parameter::from(Some("x")), Parameter::Text("x".into()));
    }

    #[test]
    fn kind_displays_lowercase() {
        assert_eq!(ParamKind::Integer.to_string(), "integer");
        assert_eq!(ParamKind::Null.to_string(), "null");
    }
}
