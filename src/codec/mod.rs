//! Columnar codec for ddtree
//!
//! Moves data trees across the tree/flat-file boundary.
//!
//! # Layout
//!
//! One variable per struct array and leaf that holds data, named by its
//! schema path. Variables nested in struct arrays carry one leading
//! dimension per enclosing array; see [`Layout`] for the naming rules. A
//! ragged array, or a leaf that does not fill its grid, is marked `sparse`:
//! missing cells hold the fill value and, for rank > 0, a `<name>:shape`
//! table records the realized extents per instance.
//!
//! # Versions
//!
//! A file is always validated and interpreted under the dictionary version it
//! was written with. Reading it under another version goes through a
//! [`VersionPathMap`](crate::migration::VersionPathMap): dropped and
//! type-changed paths are skipped and logged, never converted.
//!
//! # Validation
//!
//! On by default. [`CodecConfig::without_validation`] or the
//! `DDTREE_DISABLE_NC_VALIDATE` environment variable turn it off; a file that
//! does not match its dictionary may then decode into a corrupted tree.

mod decode;
mod encode;
mod errors;
mod grid;
mod layout;
mod lazy;
mod validate;

use std::path::Path;
use std::sync::Arc;

pub use decode::{Decoder, PlanEntry};
pub use encode::encode;
pub use errors::{CodecError, CodecResult};
pub use layout::{rank_dimension, Layout, TIME_DIMENSION};
pub use lazy::LazyDecoder;
pub use validate::validate;

use crate::columnar::{ColumnarReader, ColumnarWriter, VariableStore};
use crate::config::CodecConfig;
use crate::migration::PathMapCache;
use crate::schema::{DatasetSchema, SchemaLoader};
use crate::tree::Toplevel;

/// Encodes `ids` and writes it to `path`; returns the bytes written
pub fn save(ids: &Toplevel, path: &Path) -> CodecResult<u64> {
    let file = encode(ids)?;
    Ok(ColumnarWriter::create(path)?.write(&file)?)
}

/// Reads the file at `path` into a tree of `target`.
///
/// The file's own dictionary version comes from `loader`; when it differs
/// from `target`'s, the path map between the two comes from `maps`.
pub fn load(
    path: &Path,
    loader: &SchemaLoader,
    target: &Arc<DatasetSchema>,
    maps: &PathMapCache,
    config: CodecConfig,
) -> CodecResult<Toplevel> {
    let reader = ColumnarReader::open(path)?;
    let source = loader.dataset(reader.version(), reader.dataset())?;
    let map = if source.version() == target.version() {
        None
    } else {
        Some(maps.get(&source, target)?)
    };

    let decoder = Decoder::new(reader, source, config)?;
    if config.lazy {
        decoder.decode_lazy(Arc::clone(target), map.as_deref())
    } else {
        decoder.decode(Arc::clone(target), map.as_deref())
    }
}
