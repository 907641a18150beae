//! Schema-typed data trees
//!
//! A [`Toplevel`] is the root of one dataset instance. Below it sit three
//! kinds of node:
//!
//! - [`Structure`]: named children, instantiated on first access
//! - [`StructArray`]: a resizable sequence of structures
//! - [`Leaf`]: a typed scalar or array value
//!
//! Every node carries its [`Descriptor`](crate::schema::Descriptor) and can
//! rebuild its dataset-relative path. Elements dropped by a resize are
//! detached; any access to them fails with [`TreeError::Detached`].
//!
//! Trees are single-threaded (`Rc` handles). A tree built with
//! [`Toplevel::with_source`] reads sizes and values on demand.

mod errors;
mod identifier;
mod lazy;
mod leaf;
mod node;
mod path;
mod struct_array;
mod structure;
mod toplevel;
pub(crate) mod value;

pub use errors::{TreeError, TreeResult};
pub use identifier::IdentifierRef;
pub use lazy::MaterializationSource;
pub use leaf::Leaf;
pub use node::{Node, NodeKind};
pub use path::schema_path;
pub use struct_array::StructArray;
pub use structure::Structure;
pub use toplevel::{TimeMode, Toplevel, TIME_MODE_PATH};
pub use value::{Value, EMPTY_COMPLEX, EMPTY_FLOAT, EMPTY_INT};
