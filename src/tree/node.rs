//! Node handles and the state every node shares
//!
//! Nodes are cheap reference-counted handles. A parent owns its children;
//! children point back at their parent weakly, only to rebuild their path.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use super::errors::{TreeError, TreeResult};
use super::lazy::LazyContext;
use super::leaf::Leaf;
use super::path;
use super::struct_array::{StructArray, StructArrayCell};
use super::structure::{Structure, StructureCell};
use crate::identifiers::IdentifierRegistry;
use crate::schema::{DataKind, DatasetSchema, Descriptor};

/// State shared by every node of one toplevel
pub(crate) struct TreeContext {
    pub(crate) dataset: Arc<DatasetSchema>,
    pub(crate) identifiers: Option<Arc<dyn IdentifierRegistry>>,
}

pub(crate) enum ParentLink {
    Structure(Weak<StructureCell>),
    Element {
        array: Weak<StructArrayCell>,
        index: usize,
    },
}

pub(crate) struct NodeHeader {
    pub(crate) descriptor: Arc<Descriptor>,
    pub(crate) ctx: Rc<TreeContext>,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) lazy: RefCell<Option<LazyContext>>,
    pub(crate) detached: Cell<bool>,
}

impl NodeHeader {
    pub(crate) fn new(
        descriptor: Arc<Descriptor>,
        ctx: Rc<TreeContext>,
        parent: Option<ParentLink>,
        lazy: Option<LazyContext>,
    ) -> Self {
        Self {
            descriptor,
            ctx,
            parent,
            lazy: RefCell::new(lazy),
            detached: Cell::new(false),
        }
    }

    /// Dataset-relative path with element indices
    pub(crate) fn path(&self) -> String {
        match &self.parent {
            None => String::new(),
            Some(ParentLink::Structure(parent)) => match parent.upgrade() {
                Some(parent) => path::join(&parent.header.path(), &self.descriptor.name),
                None => self.descriptor.path.clone(),
            },
            Some(ParentLink::Element { array, index }) => match array.upgrade() {
                Some(array) => format!("{}[{}]", array.header.path(), index),
                None => format!("{}[{}]", self.descriptor.path, index),
            },
        }
    }

    pub(crate) fn ensure_attached(&self) -> TreeResult<()> {
        if self.detached.get() {
            return Err(TreeError::Detached(self.path()));
        }
        Ok(())
    }

    pub(crate) fn is_lazy(&self) -> bool {
        self.lazy.borrow().is_some()
    }

    pub(crate) fn lazy(&self) -> Option<LazyContext> {
        self.lazy.borrow().clone()
    }

    pub(crate) fn take_lazy(&self) -> Option<LazyContext> {
        self.lazy.borrow_mut().take()
    }

    pub(crate) fn detach(&self) {
        self.detached.set(true);
        self.lazy.borrow_mut().take();
    }
}

/// What a node is, for callers that match on kinds without a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Structure,
    StructArray,
    Leaf,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Structure => "a structure",
            NodeKind::StructArray => "a struct array",
            NodeKind::Leaf => "a leaf",
        }
    }
}

/// Any node of a data tree
#[derive(Clone)]
pub enum Node {
    Structure(Structure),
    StructArray(StructArray),
    Leaf(Leaf),
}

impl Node {
    /// Instantiates the node typed by `descriptor`
    pub(crate) fn new_child(
        descriptor: Arc<Descriptor>,
        ctx: Rc<TreeContext>,
        parent: ParentLink,
        lazy: Option<LazyContext>,
    ) -> Node {
        let kind = descriptor.kind;
        let header = NodeHeader::new(descriptor, ctx, Some(parent), lazy);
        match kind {
            DataKind::Structure => Node::Structure(Structure::from_header(header)),
            DataKind::StructArray => Node::StructArray(StructArray::from_header(header)),
            _ => Node::Leaf(Leaf::from_header(header)),
        }
    }

    fn header(&self) -> &NodeHeader {
        match self {
            Node::Structure(s) => &s.0.header,
            Node::StructArray(a) => &a.0.header,
            Node::Leaf(l) => &l.0.header,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Structure(_) => NodeKind::Structure,
            Node::StructArray(_) => NodeKind::StructArray,
            Node::Leaf(_) => NodeKind::Leaf,
        }
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.header().descriptor
    }

    /// Dataset-relative path, e.g. `profiles_1d[1]/ion[0]/label`
    pub fn path(&self) -> String {
        self.header().path()
    }

    /// True if this node or any descendant leaf holds a value
    pub fn has_value(&self) -> TreeResult<bool> {
        match self {
            Node::Structure(s) => s.has_value(),
            Node::StructArray(a) => a.has_value(),
            Node::Leaf(l) => l.has_value(),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.header().detached.get()
    }

    /// Same underlying node
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Structure(a), Node::Structure(b)) => Structure::ptr_eq(a, b),
            (Node::StructArray(a), Node::StructArray(b)) => StructArray::ptr_eq(a, b),
            (Node::Leaf(a), Node::Leaf(b)) => Leaf::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Node::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_array(&self) -> Option<&StructArray> {
        match self {
            Node::StructArray(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn into_structure(self) -> TreeResult<Structure> {
        match self {
            Node::Structure(s) => Ok(s),
            other => Err(other.wrong_kind(NodeKind::Structure)),
        }
    }

    pub fn into_struct_array(self) -> TreeResult<StructArray> {
        match self {
            Node::StructArray(a) => Ok(a),
            other => Err(other.wrong_kind(NodeKind::StructArray)),
        }
    }

    pub fn into_leaf(self) -> TreeResult<Leaf> {
        match self {
            Node::Leaf(l) => Ok(l),
            other => Err(other.wrong_kind(NodeKind::Leaf)),
        }
    }

    /// Named child of a structure node
    pub fn child(&self, name: &str) -> TreeResult<Node> {
        match self {
            Node::Structure(s) => s.child(name),
            other => Err(other.wrong_kind(NodeKind::Structure)),
        }
    }

    /// Walks a relative path such as `ion[0]/label`
    pub fn get(&self, path: &str) -> TreeResult<Node> {
        path::navigate(self.clone(), path)
    }

    fn wrong_kind(&self, expected: NodeKind) -> TreeError {
        TreeError::wrong_kind(self.path(), expected.as_str(), self.kind().as_str())
    }

    /// Marks this node and everything materialized below it as discarded
    pub(crate) fn detach(&self) {
        match self {
            Node::Structure(s) => s.detach(),
            Node::StructArray(a) => a.detach(),
            Node::Leaf(l) => l.0.header.detach(),
        }
    }
}

impl From<Structure> for Node {
    fn from(s: Structure) -> Self {
        Node::Structure(s)
    }
}

impl From<StructArray> for Node {
    fn from(a: StructArray) -> Self {
        Node::StructArray(a)
    }
}

impl From<Leaf> for Node {
    fn from(l: Leaf) -> Self {
        Node::Leaf(l)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Structure(s) => fmt::Debug::fmt(s, f),
            Node::StructArray(a) => fmt::Debug::fmt(a, f),
            Node::Leaf(l) => fmt::Debug::fmt(l, f),
        }
    }
}
