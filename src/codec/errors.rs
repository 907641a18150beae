//! Codec errors

use thiserror::Error;

use crate::columnar::ColumnarError;
use crate::migration::MappingError;
use crate::schema::SchemaError;
use crate::tree::TreeError;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// A stored variable does not match what the dictionary predicts
    #[error("Invalid encoding of `{variable}`: {message}")]
    InvalidEncoding { variable: String, message: String },

    #[error("The time mode (ids_properties/homogeneous_time) must be set before encoding")]
    MissingTimeMode,

    #[error("File holds dataset '{found}', expected '{expected}'")]
    DatasetMismatch { expected: String, found: String },

    #[error("File was written with dictionary {found}, the file schema given is {expected}")]
    VersionMismatch { expected: String, found: String },

    #[error("Path map converts {found}, this decode needs {expected}")]
    PathMapMismatch { expected: String, found: String },

    #[error(transparent)]
    Columnar(#[from] ColumnarError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl CodecError {
    /// "has incorrect {issue}: `{actual}`", with the expectation when known
    pub(crate) fn incorrect(
        variable: &str,
        issue: &str,
        actual: impl std::fmt::Display,
        expected: Option<String>,
    ) -> Self {
        let mut message = format!("incorrect {}: `{}`", issue, actual);
        if let Some(expected) = expected {
            message.push_str(&format!(", expected `{}`", expected));
        }
        Self::invalid(variable, message)
    }

    pub(crate) fn invalid(variable: &str, message: impl Into<String>) -> Self {
        CodecError::InvalidEncoding {
            variable: variable.to_string(),
            message: message.into(),
        }
    }

    /// Variable named by an encoding error
    pub fn variable(&self) -> Option<&str> {
        match self {
            CodecError::InvalidEncoding { variable, .. } => Some(variable),
            _ => None,
        }
    }
}
