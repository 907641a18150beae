//! Slice view errors
//!
//! Index errors are local: they name the one element that was too short,
//! not the selection as a whole.

use thiserror::Error;

use crate::tree::TreeError;

/// Result type for slice operations
pub type SliceResult<T> = Result<T, SliceError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SliceError {
    #[error("Slice step cannot be zero")]
    ZeroStep,

    #[error("Index {index} out of range for '{path}' of length {len}")]
    IndexOutOfRange { path: String, index: isize, len: usize },

    #[error("'{0}' does not select struct arrays; index its elements with `get`")]
    NotArrayWise(String),

    #[error("Cannot access '{name}' on the empty selection '{path}'")]
    Empty { path: String, name: String },

    #[error("Cannot pack the selection densely: {0}")]
    Shape(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
