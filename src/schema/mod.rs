//! Data Dictionary metadata model
//!
//! Parses one schema document per version into per-path [`Descriptor`]s.
//! Everything here is immutable once built and shared across trees and
//! threads through `Arc`.
//!
//! - Unknown `data_type` tokens and duplicate paths fail at build time
//! - Lookups by path and by (parent, child name) never allocate
//! - [`SchemaLoader`] memoizes each version, failures included

mod dictionary;
mod errors;
mod loader;
mod types;
mod version;

#[cfg(test)]
pub(crate) mod fixtures;

pub use dictionary::{DataDictionary, DatasetSchema};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::SchemaLoader;
pub use types::{
    is_time_coordinate, DataKind, DatasetDef, Descriptor, DictionaryDef, Lifecycle, NbcChange,
    NbcChangeKind, NodeDef,
};
pub use version::DdVersion;
