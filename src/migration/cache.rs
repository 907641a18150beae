//! Per version pair memoization of path maps

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::errors::MappingResult;
use super::path_map::{SharedPathMap, VersionPathMap};
use crate::schema::{DatasetSchema, DdVersion};

type CacheKey = (String, DdVersion, DdVersion);

/// Builds each (dataset, from, to) map once and hands out shared handles.
///
/// Build failures are cached as well: an inconsistent change history is
/// reported by every later request for the same pair without rebuilding.
#[derive(Debug, Default)]
pub struct PathMapCache {
    maps: Mutex<HashMap<CacheKey, MappingResult<SharedPathMap>>>,
}

impl PathMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, from: &DatasetSchema, to: &DatasetSchema) -> MappingResult<SharedPathMap> {
        let key = (from.name().to_string(), from.version(), to.version());
        let mut maps = self.maps.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = maps.get(&key) {
            return cached.clone();
        }
        let built = if from.version() == to.version() {
            Ok(Arc::new(VersionPathMap::identity(from)))
        } else {
            VersionPathMap::between(from, to).map(Arc::new)
        };
        maps.insert(key, built.clone());
        built
    }

    pub fn len(&self) -> usize {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
