//! Read access shared by in-memory and on-disk files

use std::ops::Range;
use std::sync::Arc;

use super::errors::{ColumnarError, ColumnarResult};
use super::variable::{VariableData, VariableHeader};
use crate::schema::DdVersion;

/// Anything the decoder can read variables from
pub trait VariableStore {
    /// Name of the dataset stored
    fn dataset(&self) -> &str;

    /// Dictionary version the data was written under
    fn version(&self) -> DdVersion;

    fn dimension(&self, name: &str) -> Option<usize>;

    /// Variable names in sorted order
    fn variable_names(&self) -> Vec<&str>;

    fn header(&self, name: &str) -> Option<&VariableHeader>;

    /// Whole-variable data
    fn read(&self, name: &str) -> ColumnarResult<Arc<VariableData>>;

    /// Elements of the sub-block at leading index `prefix`, spanning every
    /// remaining dimension, in row-major order.
    ///
    /// The default cuts the block out of the whole variable.
    fn read_block(&self, name: &str, prefix: &[usize]) -> ColumnarResult<VariableData> {
        let range = block_range(name, &self.shape(name)?, prefix)?;
        let data = self.read(name)?;
        data.slice(range.clone()).ok_or_else(|| {
            ColumnarError::invalid_variable(
                name,
                format!("holds {} elements, block needs {:?}", data.len(), range),
            )
        })
    }

    fn contains(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Sizes of the variable's dimensions
    fn shape(&self, name: &str) -> ColumnarResult<Vec<usize>> {
        let header = self
            .header(name)
            .ok_or_else(|| ColumnarError::unknown_variable(name))?;
        header
            .dimensions
            .iter()
            .map(|d| {
                self.dimension(d).ok_or_else(|| {
                    ColumnarError::invalid_variable(name, format!("undeclared dimension '{}'", d))
                })
            })
            .collect()
    }
}

impl<T: VariableStore + ?Sized> VariableStore for &T {
    fn dataset(&self) -> &str {
        (**self).dataset()
    }

    fn version(&self) -> DdVersion {
        (**self).version()
    }

    fn dimension(&self, name: &str) -> Option<usize> {
        (**self).dimension(name)
    }

    fn variable_names(&self) -> Vec<&str> {
        (**self).variable_names()
    }

    fn header(&self, name: &str) -> Option<&VariableHeader> {
        (**self).header(name)
    }

    fn read(&self, name: &str) -> ColumnarResult<Arc<VariableData>> {
        (**self).read(name)
    }

    fn read_block(&self, name: &str, prefix: &[usize]) -> ColumnarResult<VariableData> {
        (**self).read_block(name, prefix)
    }
}

/// Element range of the sub-block at leading index `prefix` in a grid of
/// `shape`, row-major
pub fn block_range(name: &str, shape: &[usize], prefix: &[usize]) -> ColumnarResult<Range<usize>> {
    let invalid = |reason: String| ColumnarError::invalid_variable(name, reason);
    if prefix.len() > shape.len() {
        return Err(invalid(format!(
            "index {:?} has more axes than the grid {:?}",
            prefix, shape
        )));
    }

    let (outer, inner) = shape.split_at(prefix.len());
    let overflow = || invalid(format!("grid {:?} overflows the address space", shape));
    let block = inner
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(overflow)?;
    let mut row = 0usize;
    for (&i, &n) in prefix.iter().zip(outer) {
        if i >= n {
            return Err(invalid(format!(
                "index {:?} lies outside the grid {:?}",
                prefix, shape
            )));
        }
        row = row
            .checked_mul(n)
            .and_then(|r| r.checked_add(i))
            .ok_or_else(overflow)?;
    }
    let start = row.checked_mul(block).ok_or_else(overflow)?;
    let end = start.checked_add(block).ok_or_else(overflow)?;
    Ok(start..end)
}

/// Number of elements in a grid of `shape`
pub fn element_count(name: &str, shape: &[usize]) -> ColumnarResult<usize> {
    Ok(block_range(name, shape, &[])?.end)
}
