//! Tree errors
//!
//! Every variant names the dataset-relative path it was raised for. None of
//! these are retried: they signal a programming error or malformed input.

use thiserror::Error;

use crate::schema::SchemaError;

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TreeError {
    #[error("'{path}' has no child named '{name}'")]
    UnknownField { path: String, name: String },

    #[error("Cannot assign to '{path}' ({expected}): {reason}")]
    TypeMismatch {
        path: String,
        expected: String,
        reason: String,
    },

    #[error("'{path}' is {actual}, expected {expected}")]
    WrongKind {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Index {index} out of range for '{path}' of length {len}")]
    IndexOutOfRange { path: String, index: usize, len: usize },

    #[error("Node '{0}' was discarded by a resize")]
    Detached(String),

    #[error("Invalid path '{0}': {1}")]
    InvalidPath(String, String),

    #[error("Invalid time mode {0}, expected 0, 1 or 2")]
    InvalidTimeMode(i32),

    #[error("Identifier at '{path}': {reason}")]
    Identifier { path: String, reason: String },

    #[error("Failed to materialize '{0}': {1}")]
    Materialization(String, String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl TreeError {
    pub(crate) fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TreeError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn wrong_kind(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        TreeError::WrongKind {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Path the error was raised for
    pub fn path(&self) -> Option<&str> {
        match self {
            TreeError::UnknownField { path, .. }
            | TreeError::TypeMismatch { path, .. }
            | TreeError::WrongKind { path, .. }
            | TreeError::IndexOutOfRange { path, .. }
            | TreeError::Identifier { path, .. } => Some(path),
            TreeError::Detached(path)
            | TreeError::InvalidPath(path, _)
            | TreeError::Materialization(path, _) => Some(path),
            TreeError::InvalidTimeMode(_) => None,
            TreeError::Schema(e) => e.path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TreeError::UnknownField {
            path: "profiles_1d[0]".into(),
            name: "nope".into(),
        };
        assert_eq!(err.to_string(), "'profiles_1d[0]' has no child named 'nope'");
        assert_eq!(err.path(), Some("profiles_1d[0]"));
    }

    #[test]
    fn test_schema_error_converts() {
        let err: TreeError = SchemaError::unknown_path("core_profiles", "x/y").into();
        assert_eq!(err.path(), Some("x/y"));
    }
}
