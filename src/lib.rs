//! ddtree - schema-typed data trees for versioned scientific datasets
//!
//! A data dictionary ([`schema`]) describes every dataset of one version.
//! Datasets are held as generic [`tree`]s typed by that dictionary,
//! remapped between dictionary versions by [`migration`], stored through
//! the [`codec`] in a self-describing [`columnar`] file, and read back
//! eagerly or lazily. [`slice`] views address nested struct arrays as
//! rectangular arrays.

pub mod codec;
pub mod columnar;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod migration;
pub mod observability;
pub mod schema;
pub mod slice;
pub mod tree;

pub use codec::{load, save};
pub use config::CodecConfig;
pub use error::{Error, Result};
pub use schema::{DataDictionary, DatasetSchema, DdVersion, SchemaLoader};
pub use slice::{SliceSpec, SliceView};
pub use tree::{Node, TimeMode, Toplevel, Value};
