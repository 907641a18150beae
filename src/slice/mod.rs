//! Multi-dimensional views over struct arrays
//!
//! A [`SliceView`] starts as a range of one struct array and is refined by
//! further indexing and child descent:
//!
//! ```text
//! profiles_1d[1:4]/ion[:]/z_ion
//! ```
//!
//! Ranges over a selection of struct arrays keep one group per array, so
//! the result can be packed into a [`DenseArray`] whose leading axes are the
//! nesting levels. Ragged groups pack into an object array instead.
//! Indexing never clamps: an element too short for an integer index is an
//! error naming that element.

mod dense;
mod errors;
mod spec;
mod view;

pub use dense::DenseArray;
pub use errors::{SliceError, SliceResult};
pub use spec::SliceSpec;
pub use view::{Item, Selection, SliceView};
