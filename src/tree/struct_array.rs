//! Struct arrays: resizable sequences of structures

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::errors::{TreeError, TreeResult};
use super::node::NodeHeader;
use super::structure::Structure;
use crate::schema::Descriptor;

pub(crate) struct StructArrayCell {
    pub(crate) header: NodeHeader,
    elements: RefCell<Vec<Structure>>,
}

/// An ordered, resizable sequence of structures sharing one descriptor
#[derive(Clone)]
pub struct StructArray(pub(crate) Rc<StructArrayCell>);

impl StructArray {
    pub(crate) fn from_header(header: NodeHeader) -> Self {
        StructArray(Rc::new(StructArrayCell {
            header,
            elements: RefCell::new(Vec::new()),
        }))
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.0.header.descriptor
    }

    pub fn path(&self) -> String {
        self.0.header.path()
    }

    /// Sizes a lazily backed array from its source, once
    fn materialize(&self) -> TreeResult<()> {
        self.0.header.ensure_attached()?;
        let Some(lazy) = self.0.header.take_lazy() else {
            return Ok(());
        };
        let size = lazy.struct_array_size(&self.descriptor().path)?;
        let mut elements = self.0.elements.borrow_mut();
        for i in elements.len()..size {
            elements.push(Structure::new_element(&self.0, i, Some(lazy.element(i))));
        }
        Ok(())
    }

    pub fn len(&self) -> TreeResult<usize> {
        self.materialize()?;
        Ok(self.0.elements.borrow().len())
    }

    pub fn is_empty(&self) -> TreeResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Element `index`; no clamping
    pub fn get(&self, index: usize) -> TreeResult<Structure> {
        self.materialize()?;
        let elements = self.0.elements.borrow();
        elements
            .get(index)
            .cloned()
            .ok_or_else(|| TreeError::IndexOutOfRange {
                path: self.path(),
                index,
                len: elements.len(),
            })
    }

    pub fn elements(&self) -> TreeResult<Vec<Structure>> {
        self.materialize()?;
        Ok(self.0.elements.borrow().clone())
    }

    /// Grows with fresh elements or drops trailing ones to exactly `n`.
    ///
    /// Existing elements keep their identity and position. Dropped elements
    /// are detached: any later access to them fails.
    pub fn resize(&self, n: usize) -> TreeResult<()> {
        self.materialize()?;
        let mut elements = self.0.elements.borrow_mut();
        if n < elements.len() {
            for discarded in elements.drain(n..) {
                discarded.detach();
            }
        } else {
            for i in elements.len()..n {
                elements.push(Structure::new_element(&self.0, i, None));
            }
        }
        Ok(())
    }

    /// Appends a fresh element and returns it
    pub fn push(&self) -> TreeResult<Structure> {
        self.materialize()?;
        let mut elements = self.0.elements.borrow_mut();
        let element = Structure::new_element(&self.0, elements.len(), None);
        elements.push(element.clone());
        Ok(element)
    }

    pub fn has_value(&self) -> TreeResult<bool> {
        for element in self.elements()? {
            if element.has_value()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn is_detached(&self) -> bool {
        self.0.header.detached.get()
    }

    pub fn ptr_eq(a: &StructArray, b: &StructArray) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn detach(&self) {
        self.0.header.detach();
        for element in self.0.elements.borrow().iter() {
            element.detach();
        }
    }
}

impl fmt::Debug for StructArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructArray")
            .field("path", &self.path())
            .field("len", &self.0.elements.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::fixtures;
    use crate::tree::{StructArray, Structure, Toplevel, TreeError};

    fn profiles() -> (Toplevel, StructArray) {
        let ids = Toplevel::new(fixtures::dictionary_v1().dataset("core_profiles").unwrap());
        let array = ids.root().struct_array("profiles_1d").unwrap();
        (ids, array)
    }

    #[test]
    fn test_resize_grows_and_shrinks() {
        let (_ids, array) = profiles();
        assert!(array.is_empty().unwrap());
        array.resize(3).unwrap();
        assert_eq!(array.len().unwrap(), 3);
        array.resize(1).unwrap();
        assert_eq!(array.len().unwrap(), 1);
    }

    #[test]
    fn test_resize_same_size_keeps_identity_and_values() {
        let (_ids, array) = profiles();
        array.resize(2).unwrap();
        let first = array.get(0).unwrap();
        first.leaf("time").unwrap().set_value(1.5).unwrap();

        array.resize(2).unwrap();
        array.resize(2).unwrap();

        let again = array.get(0).unwrap();
        assert!(Structure::ptr_eq(&first, &again));
        assert_eq!(again.leaf("time").unwrap().as_f64().unwrap(), 1.5);
    }

    #[test]
    fn test_regrowth_yields_fresh_elements() {
        let (_ids, array) = profiles();
        array.resize(3).unwrap();
        let old = array.get(2).unwrap();
        old.leaf("time").unwrap().set_value(2.0).unwrap();

        array.resize(1).unwrap();
        array.resize(3).unwrap();

        let fresh = array.get(2).unwrap();
        assert!(!Structure::ptr_eq(&old, &fresh));
        assert!(!fresh.has_value().unwrap());
    }

    #[test]
    fn test_discarded_elements_are_detached() {
        let (_ids, array) = profiles();
        array.resize(2).unwrap();
        let gone = array.get(1).unwrap();
        let leaf = gone.get("electrons/temperature").unwrap();
        array.resize(1).unwrap();

        assert!(gone.is_detached());
        assert!(matches!(gone.child("time"), Err(TreeError::Detached(_))));
        assert!(leaf.is_detached());
        let err = leaf.into_leaf().unwrap().value().unwrap_err();
        assert_eq!(err, TreeError::Detached("profiles_1d[1]/electrons/temperature".into()));
    }

    #[test]
    fn test_get_out_of_range() {
        let (_ids, array) = profiles();
        array.resize(2).unwrap();
        let err = array.get(5).unwrap_err();
        assert_eq!(
            err,
            TreeError::IndexOutOfRange {
                path: "profiles_1d".into(),
                index: 5,
                len: 2
            }
        );
    }

    #[test]
    fn test_push_appends() {
        let (_ids, array) = profiles();
        array.resize(1).unwrap();
        let pushed = array.push().unwrap();
        assert_eq!(pushed.element_index(), Some(1));
        assert_eq!(pushed.path(), "profiles_1d[1]");
        assert_eq!(array.len().unwrap(), 2);
    }

    #[test]
    fn test_element_paths() {
        let (_ids, array) = profiles();
        array.resize(2).unwrap();
        let ion = array.get(1).unwrap().struct_array("ion").unwrap();
        ion.resize(1).unwrap();
        let label = ion.get(0).unwrap().leaf("label").unwrap();
        assert_eq!(label.path(), "profiles_1d[1]/ion[0]/label");
    }
}
