//! Deferred materialization
//!
//! A tree built over a [`MaterializationSource`] instantiates nothing up
//! front. Each struct array asks the source for its size, and each leaf for
//! its value, the first time it is touched; the answer is kept and the
//! source is never consulted again for that node. Writing to a node before
//! it was read discards its pending read.

use std::rc::Rc;

use super::errors::TreeResult;
use super::value::Value;

/// Supplies sizes and values for a lazily backed tree.
///
/// `path` is the schema path of the node (no indices) and `index` holds the
/// element index of every enclosing struct array, outermost first.
pub trait MaterializationSource {
    /// Number of elements of the struct array at `path`
    fn struct_array_size(&self, path: &str, index: &[usize]) -> TreeResult<usize>;

    /// Stored value of the leaf at `path`, or `None` when nothing was stored
    fn leaf_value(&self, path: &str, index: &[usize]) -> TreeResult<Option<Value>>;
}

/// A node's handle on the source plus its accumulated index tuple
#[derive(Clone)]
pub(crate) struct LazyContext {
    source: Rc<dyn MaterializationSource>,
    index: Vec<usize>,
}

impl LazyContext {
    pub(crate) fn new(source: Rc<dyn MaterializationSource>) -> Self {
        Self {
            source,
            index: Vec::new(),
        }
    }

    /// Context for element `i` of a struct array holding this context
    pub(crate) fn element(&self, i: usize) -> Self {
        let mut index = Vec::with_capacity(self.index.len() + 1);
        index.extend_from_slice(&self.index);
        index.push(i);
        Self {
            source: Rc::clone(&self.source),
            index,
        }
    }

    pub(crate) fn struct_array_size(&self, path: &str) -> TreeResult<usize> {
        self.source.struct_array_size(path, &self.index)
    }

    pub(crate) fn leaf_value(&self, path: &str) -> TreeResult<Option<Value>> {
        self.source.leaf_value(path, &self.index)
    }
}
