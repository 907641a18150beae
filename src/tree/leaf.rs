//! Leaf nodes
//!
//! An untouched leaf reports the type-correct default of its descriptor.
//! `has_value` is true only for a stored value that differs from that
//! default, which is exactly what the fill-value encoding can round-trip.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ndarray::ArrayD;
use num_complex::Complex64;

use super::errors::{TreeError, TreeResult};
use super::node::NodeHeader;
use super::value::Value;
use crate::schema::{DataKind, Descriptor};

pub(crate) struct LeafCell {
    pub(crate) header: NodeHeader,
    value: RefCell<Option<Value>>,
}

/// A scalar or fixed-rank array value node
#[derive(Clone)]
pub struct Leaf(pub(crate) Rc<LeafCell>);

impl Leaf {
    pub(crate) fn from_header(header: NodeHeader) -> Self {
        Leaf(Rc::new(LeafCell {
            header,
            value: RefCell::new(None),
        }))
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.0.header.descriptor
    }

    pub fn path(&self) -> String {
        self.0.header.path()
    }

    pub fn kind(&self) -> DataKind {
        self.descriptor().kind
    }

    pub fn ndim(&self) -> usize {
        self.descriptor().ndim
    }

    /// Declared type, e.g. `FLT_1D`
    pub fn type_label(&self) -> String {
        format!("{}_{}D", self.kind().type_name(), self.ndim())
    }

    /// Pulls the pending value from a lazy source, once
    fn materialize(&self) -> TreeResult<()> {
        self.0.header.ensure_attached()?;
        let Some(lazy) = self.0.header.take_lazy() else {
            return Ok(());
        };
        if let Some(value) = lazy.leaf_value(&self.descriptor().path)? {
            let value = value
                .coerce(self.kind(), self.ndim())
                .map_err(|reason| TreeError::type_mismatch(self.path(), self.type_label(), reason))?;
            *self.0.value.borrow_mut() = Some(value);
        }
        Ok(())
    }

    /// Current value, or the declared default when unset
    pub fn value(&self) -> TreeResult<Value> {
        self.with_value(Value::clone)
    }

    /// Runs `f` on the current value without cloning it
    pub fn with_value<R>(&self, f: impl FnOnce(&Value) -> R) -> TreeResult<R> {
        self.materialize()?;
        let stored = self.0.value.borrow();
        match stored.as_ref() {
            Some(value) => Ok(f(value)),
            None => Ok(f(&Value::default_for(self.kind(), self.ndim()))),
        }
    }

    /// Stores `value` after kind and rank checked coercion
    pub fn set_value(&self, value: impl Into<Value>) -> TreeResult<()> {
        self.0.header.ensure_attached()?;
        let value = value
            .into()
            .coerce(self.kind(), self.ndim())
            .map_err(|reason| TreeError::type_mismatch(self.path(), self.type_label(), reason))?;
        self.0.header.take_lazy();
        *self.0.value.borrow_mut() = Some(value);
        Ok(())
    }

    pub fn has_value(&self) -> TreeResult<bool> {
        self.materialize()?;
        Ok(self
            .0
            .value
            .borrow()
            .as_ref()
            .map_or(false, |v| !v.is_default()))
    }

    /// Resets to the declared default
    pub fn clear(&self) -> TreeResult<()> {
        self.0.header.ensure_attached()?;
        self.0.header.take_lazy();
        *self.0.value.borrow_mut() = None;
        Ok(())
    }

    /// Unwraps the value, applies `f` and stores the result.
    ///
    /// The result goes through the same checks as [`Leaf::set_value`], so a
    /// computation that changes kind or rank is rejected.
    pub fn transform<V, F>(&self, f: F) -> TreeResult<()>
    where
        V: Into<Value>,
        F: FnOnce(Value) -> V,
    {
        let current = self.value()?;
        self.set_value(f(current))
    }

    pub fn as_str(&self) -> TreeResult<String> {
        match self.value()? {
            Value::Str(s) => Ok(s),
            other => Err(self.unexpected("STR_0D", &other)),
        }
    }

    pub fn as_i32(&self) -> TreeResult<i32> {
        match self.value()? {
            Value::Int(i) => Ok(i),
            other => Err(self.unexpected("INT_0D", &other)),
        }
    }

    pub fn as_f64(&self) -> TreeResult<f64> {
        match self.value()? {
            Value::Float(f) => Ok(f),
            other => Err(self.unexpected("FLT_0D", &other)),
        }
    }

    pub fn as_complex(&self) -> TreeResult<Complex64> {
        match self.value()? {
            Value::Complex(c) => Ok(c),
            other => Err(self.unexpected("CPX_0D", &other)),
        }
    }

    pub fn str_array(&self) -> TreeResult<Vec<String>> {
        match self.value()? {
            Value::StrArray(v) => Ok(v),
            other => Err(self.unexpected("STR_1D", &other)),
        }
    }

    pub fn int_array(&self) -> TreeResult<ArrayD<i32>> {
        match self.value()? {
            Value::IntArray(a) => Ok(a),
            other => Err(self.unexpected("an INT array", &other)),
        }
    }

    pub fn float_array(&self) -> TreeResult<ArrayD<f64>> {
        match self.value()? {
            Value::FloatArray(a) => Ok(a),
            other => Err(self.unexpected("a FLT array", &other)),
        }
    }

    pub fn complex_array(&self) -> TreeResult<ArrayD<Complex64>> {
        match self.value()? {
            Value::ComplexArray(a) => Ok(a),
            other => Err(self.unexpected("a CPX array", &other)),
        }
    }

    fn unexpected(&self, expected: &str, actual: &Value) -> TreeError {
        TreeError::wrong_kind(self.path(), expected, actual.type_label())
    }

    pub fn is_detached(&self) -> bool {
        self.0.header.detached.get()
    }

    pub fn ptr_eq(a: &Leaf, b: &Leaf) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("path", &self.path())
            .field("type", &self.type_label())
            .field("value", &self.0.value.borrow())
            .finish()
    }
}
