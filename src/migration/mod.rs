//! Cross-version path mapping
//!
//! Data written under one Data Dictionary version is read under another by
//! resolving every stored path through a [`VersionPathMap`]. Maps are built
//! from the rename and type-change history a dictionary records on its
//! nodes, checked once at build time, and never mutated afterwards; share
//! them freely across trees and threads.
//!
//! ```ignore
//! let map = VersionPathMap::between(&v1, &v2)?;
//! match map.resolve("profiles_1d/ion/label") {
//!     Resolution::Mapped(path) => { /* write into `path` */ }
//!     Resolution::Dropped | Resolution::TypeChanged => { /* skip */ }
//! }
//! ```

mod annotation;
mod cache;
mod errors;
mod path_map;

pub use annotation::{Annotation, AnnotationSet};
pub use cache::PathMapCache;
pub use errors::{MappingError, MappingResult};
pub use path_map::{Resolution, SharedPathMap, VersionPathMap};
