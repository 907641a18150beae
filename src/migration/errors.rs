//! Version mapping errors
//!
//! All of these are raised while an annotation set or a path map is built,
//! never per lookup. A bad annotation set makes every map built from it
//! unusable, so callers should treat them as fatal.

use thiserror::Error;

use crate::schema::DdVersion;

/// Result type for migration operations
pub type MappingResult<T> = Result<T, MappingError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Annotations for '{path}' are not version ordered: {first} then {second}")]
    MisOrdered {
        path: String,
        first: DdVersion,
        second: DdVersion,
    },

    #[error("Ambiguous annotations for '{path}' at {version}: '{a}' and '{b}'")]
    Ambiguous {
        path: String,
        version: DdVersion,
        a: String,
        b: String,
    },

    #[error("Invalid annotation '{0}': {1}")]
    InvalidAnnotation(String, String),

    #[error("Cannot map between datasets '{0}' and '{1}'")]
    DatasetMismatch(String, String),
}
