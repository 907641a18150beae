//! Dataset roots and the dataset-wide time mode

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{TreeError, TreeResult};
use super::lazy::{LazyContext, MaterializationSource};
use super::node::{Node, NodeHeader, TreeContext};
use super::structure::Structure;
use super::value::{Value, EMPTY_INT};
use crate::identifiers::IdentifierRegistry;
use crate::schema::{DatasetSchema, DdVersion};

/// Leaf holding the dataset's time mode
pub const TIME_MODE_PATH: &str = "ids_properties/homogeneous_time";

/// How the dynamic nodes of a dataset are timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeMode {
    /// Each dynamic node carries its own time base
    Heterogeneous = 0,
    /// All dynamic nodes share the root `time` vector
    Homogeneous = 1,
    /// No time base; dynamic nodes are not stored
    Independent = 2,
}

impl TimeMode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for TimeMode {
    type Error = TreeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TimeMode::Heterogeneous),
            1 => Ok(TimeMode::Homogeneous),
            2 => Ok(TimeMode::Independent),
            other => Err(TreeError::InvalidTimeMode(other)),
        }
    }
}

impl fmt::Display for TimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeMode::Heterogeneous => "heterogeneous",
            TimeMode::Homogeneous => "homogeneous",
            TimeMode::Independent => "independent",
        };
        write!(f, "{}", name)
    }
}

/// The root of one dataset instance; owns the whole tree
#[derive(Clone)]
pub struct Toplevel {
    dataset: Arc<DatasetSchema>,
    root: Structure,
}

impl Toplevel {
    /// An empty tree typed by `dataset`
    pub fn new(dataset: Arc<DatasetSchema>) -> Self {
        Self::build(dataset, None, None)
    }

    /// A tree whose nodes are filled on first access from `source`
    pub fn with_source(dataset: Arc<DatasetSchema>, source: Rc<dyn MaterializationSource>) -> Self {
        Self::build(dataset, None, Some(LazyContext::new(source)))
    }

    /// Attaches an identifier registry.
    ///
    /// Rebuilds the root, so call it before populating the tree.
    pub fn with_identifiers(self, registry: Arc<dyn IdentifierRegistry>) -> Self {
        let lazy = self.root.0.header.lazy();
        Self::build(self.dataset, Some(registry), lazy)
    }

    fn build(
        dataset: Arc<DatasetSchema>,
        identifiers: Option<Arc<dyn IdentifierRegistry>>,
        lazy: Option<LazyContext>,
    ) -> Self {
        let ctx = Rc::new(TreeContext {
            dataset: Arc::clone(&dataset),
            identifiers,
        });
        let header = NodeHeader::new(Arc::clone(dataset.root()), ctx, None, lazy);
        Self {
            dataset,
            root: Structure::from_header(header),
        }
    }

    pub fn root(&self) -> &Structure {
        &self.root
    }

    pub fn schema(&self) -> &Arc<DatasetSchema> {
        &self.dataset
    }

    /// Dataset name
    pub fn name(&self) -> &str {
        self.dataset.name()
    }

    pub fn version(&self) -> DdVersion {
        self.dataset.version()
    }

    /// True while the tree still reads from a materialization source
    pub fn is_lazy(&self) -> bool {
        self.root.0.header.is_lazy()
    }

    pub fn child(&self, name: &str) -> TreeResult<Node> {
        self.root.child(name)
    }

    /// Navigates a path such as `profiles_1d[0]/ion[1]/label`
    pub fn get(&self, path: &str) -> TreeResult<Node> {
        self.root.get(path)
    }

    /// Assigns the leaf at `path`
    pub fn set(&self, path: &str, value: impl Into<Value>) -> TreeResult<()> {
        self.get(path)?.into_leaf()?.set_value(value)
    }

    pub fn has_value(&self) -> TreeResult<bool> {
        self.root.has_value()
    }

    /// The declared time mode, `None` while unset
    pub fn time_mode(&self) -> TreeResult<Option<TimeMode>> {
        let raw = self.get(TIME_MODE_PATH)?.into_leaf()?.as_i32()?;
        if raw == EMPTY_INT {
            return Ok(None);
        }
        TimeMode::try_from(raw).map(Some)
    }

    pub fn set_time_mode(&self, mode: TimeMode) -> TreeResult<()> {
        self.set(TIME_MODE_PATH, mode.as_i32())
    }
}

impl fmt::Debug for Toplevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toplevel")
            .field("dataset", &self.dataset.name())
            .field("version", &self.dataset.version())
            .finish()
    }
}
