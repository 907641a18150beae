//! Self-describing columnar container
//!
//! A columnar file holds named, dimensioned variables plus the dataset
//! name and dictionary version they were written under. It knows nothing
//! about trees; the codec maps trees onto variables.
//!
//! # Design Principles
//!
//! - Header and every data block carry a CRC32, verified on every read
//! - Corruption is fatal for the file: nothing is repaired or skipped
//! - Files are written whole and fsynced; there are no in-place updates
//! - Readers load variables on demand and cache them; a sub-block read
//!   touches only the checksum chunks that hold it

mod checksum;
mod errors;
mod file;
mod reader;
mod record;
mod store;
mod variable;
mod writer;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{ColumnarError, ColumnarErrorCode, ColumnarResult, Severity};
pub use file::{ColumnarFile, Variable};
pub use reader::ColumnarReader;
pub use record::{FORMAT_VERSION, MAGIC};
pub use store::VariableStore;
pub use variable::{attrs, shape_table_name, AttrValue, DType, VariableData, VariableHeader};
pub use writer::ColumnarWriter;
