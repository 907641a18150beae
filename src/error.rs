//! Crate-level error
//!
//! Wraps the subsystem errors for callers that cross several of them, such
//! as loading a file under another dictionary version and slicing the
//! result.

use thiserror::Error;

use crate::codec::CodecError;
use crate::columnar::ColumnarError;
use crate::identifiers::IdentifierError;
use crate::migration::MappingError;
use crate::schema::SchemaError;
use crate::slice::SliceError;
use crate::tree::TreeError;

/// Result type for crate-level operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Columnar(#[from] ColumnarError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Slice(#[from] SliceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_errors_convert() {
        fn slice() -> Result<()> {
            Err(SliceError::ZeroStep.into())
        }
        let err = slice().unwrap_err();
        assert!(matches!(err, Error::Slice(SliceError::ZeroStep)));
        assert_eq!(err.to_string(), "Slice step cannot be zero");

        let tree: Error = TreeError::Detached("profiles_1d[3]".into()).into();
        assert!(tree.to_string().contains("profiles_1d[3]"));
    }
}
