//! Structure nodes
//!
//! Children are instantiated on first access from the descriptor table and
//! then kept; that child cache is the only state a read accessor mutates.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::errors::{TreeError, TreeResult};
use super::lazy::LazyContext;
use super::leaf::Leaf;
use super::node::{Node, NodeHeader, ParentLink};
use super::path;
use super::struct_array::{StructArray, StructArrayCell};
use crate::schema::Descriptor;

pub(crate) struct StructureCell {
    pub(crate) header: NodeHeader,
    children: RefCell<HashMap<String, Node>>,
}

/// A node with named, schema-typed children.
///
/// Elements of a struct array are structures too; their descriptor is the
/// struct array's.
#[derive(Clone)]
pub struct Structure(pub(crate) Rc<StructureCell>);

impl Structure {
    pub(crate) fn from_header(header: NodeHeader) -> Self {
        Structure(Rc::new(StructureCell {
            header,
            children: RefCell::new(HashMap::new()),
        }))
    }

    /// Element `index` of `array`
    pub(crate) fn new_element(
        array: &Rc<StructArrayCell>,
        index: usize,
        lazy: Option<LazyContext>,
    ) -> Self {
        let header = NodeHeader::new(
            Arc::clone(&array.header.descriptor),
            Rc::clone(&array.header.ctx),
            Some(ParentLink::Element {
                array: Rc::downgrade(array),
                index,
            }),
            lazy,
        );
        Self::from_header(header)
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.0.header.descriptor
    }

    pub fn path(&self) -> String {
        self.0.header.path()
    }

    /// Position within the owning struct array, `None` for plain structures
    pub fn element_index(&self) -> Option<usize> {
        match &self.0.header.parent {
            Some(ParentLink::Element { index, .. }) => Some(*index),
            _ => None,
        }
    }

    /// Returns the named child, instantiating it on first access
    pub fn child(&self, name: &str) -> TreeResult<Node> {
        let header = &self.0.header;
        header.ensure_attached()?;

        if let Some(node) = self.0.children.borrow().get(name) {
            return Ok(node.clone());
        }

        let descriptor = header
            .ctx
            .dataset
            .child(&header.descriptor.path, name)
            .cloned()
            .ok_or_else(|| TreeError::UnknownField {
                path: self.path(),
                name: name.to_string(),
            })?;

        let node = Node::new_child(
            descriptor,
            Rc::clone(&header.ctx),
            ParentLink::Structure(Rc::downgrade(&self.0)),
            header.lazy(),
        );
        self.0
            .children
            .borrow_mut()
            .insert(name.to_string(), node.clone());
        Ok(node)
    }

    pub fn structure(&self, name: &str) -> TreeResult<Structure> {
        self.child(name)?.into_structure()
    }

    pub fn struct_array(&self, name: &str) -> TreeResult<StructArray> {
        self.child(name)?.into_struct_array()
    }

    pub fn leaf(&self, name: &str) -> TreeResult<Leaf> {
        self.child(name)?.into_leaf()
    }

    /// Walks a relative path such as `ion[0]/label`
    pub fn get(&self, path: &str) -> TreeResult<Node> {
        path::navigate(Node::Structure(self.clone()), path)
    }

    /// Children that may hold data, in schema order.
    ///
    /// For a lazily backed structure that is every schema child; otherwise
    /// only the children instantiated so far.
    pub fn children(&self) -> TreeResult<Vec<Node>> {
        self.0.header.ensure_attached()?;
        let names = &self.descriptor().children;
        if self.0.header.is_lazy() {
            return names.iter().map(|name| self.child(name)).collect();
        }
        let children = self.0.children.borrow();
        Ok(names
            .iter()
            .filter_map(|name| children.get(name).cloned())
            .collect())
    }

    /// Recursive OR over the children; never cached
    pub fn has_value(&self) -> TreeResult<bool> {
        for child in self.children()? {
            if child.has_value()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn is_detached(&self) -> bool {
        self.0.header.detached.get()
    }

    pub fn ptr_eq(a: &Structure, b: &Structure) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn detach(&self) {
        self.0.header.detach();
        for child in self.0.children.borrow().values() {
            child.detach();
        }
    }
}

impl fmt::Debug for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("path", &self.path())
            .finish()
    }
}
