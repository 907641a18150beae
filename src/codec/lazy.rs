//! Deferred decoding
//!
//! [`LazyDecoder`] answers the tree's materialization requests from the
//! store. Nothing is read up front: a struct array reads its size, and a leaf
//! its own sub-block of the variable, the first time the tree touches it.
//! Variables missing from the file read as empty struct arrays and unset
//! leaves.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use super::decode::{Decoder, PlanEntry};
use super::errors::CodecError;
use crate::columnar::VariableStore;
use crate::observability::{log_event, Event};
use crate::schema::{DatasetSchema, Descriptor};
use crate::tree::{MaterializationSource, Toplevel, TreeError, TreeResult, Value};

pub struct LazyDecoder<S> {
    decoder: Decoder<S>,
    /// Target schema path -> descriptor of the stored variable
    sources: HashMap<String, Arc<Descriptor>>,
}

impl<S: VariableStore> LazyDecoder<S> {
    pub(crate) fn new(decoder: Decoder<S>, plan: Vec<PlanEntry>) -> Self {
        let sources = plan
            .into_iter()
            .map(|entry| (entry.target.path.clone(), entry.source))
            .collect();
        Self { decoder, sources }
    }

    /// Number of target paths backed by a stored variable
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn failed(path: &str, error: CodecError) -> TreeError {
        TreeError::Materialization(path.to_string(), error.to_string())
    }
}

impl<S: VariableStore + 'static> LazyDecoder<S> {
    /// A tree of `target` backed by this decoder
    pub fn into_toplevel(self, target: Arc<DatasetSchema>) -> Toplevel {
        Toplevel::with_source(target, Rc::new(self))
    }
}

impl<S: VariableStore> MaterializationSource for LazyDecoder<S> {
    fn struct_array_size(&self, path: &str, index: &[usize]) -> TreeResult<usize> {
        let Some(source) = self.sources.get(path) else {
            return Ok(0);
        };
        let size = self
            .decoder
            .struct_array_size(source, index)
            .map_err(|e| Self::failed(path, e))?;
        let size_field = size.to_string();
        log_event(
            Event::LazyMaterialized,
            &[("path", path), ("size", size_field.as_str())],
        );
        Ok(size)
    }

    fn leaf_value(&self, path: &str, index: &[usize]) -> TreeResult<Option<Value>> {
        let Some(source) = self.sources.get(path) else {
            return Ok(None);
        };
        let value = self
            .decoder
            .leaf_value(source, index)
            .map_err(|e| Self::failed(path, e))?;
        log_event(Event::LazyMaterialized, &[("path", path)]);
        Ok(value)
    }
}
