//! Data Dictionary loader
//!
//! - One schema document per version at `<schema_dir>/<version>.json`
//! - Each version is parsed at most once; the result is cached, failures
//!   included, so a broken dictionary is reported once and never retried
//! - Loaded dictionaries are immutable and shared through `Arc`

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::dictionary::{DataDictionary, DatasetSchema};
use super::errors::{SchemaError, SchemaResult};
use super::version::DdVersion;
use crate::observability::{log_event, Event};

/// Loads and memoizes Data Dictionary versions from a directory
pub struct SchemaLoader {
    schema_dir: PathBuf,
    cache: Mutex<HashMap<DdVersion, SchemaResult<Arc<DataDictionary>>>>,
}

impl SchemaLoader {
    /// Creates a loader reading `<schema_dir>/<version>.json`
    pub fn new(schema_dir: impl AsRef<Path>) -> Self {
        Self {
            schema_dir: schema_dir.as_ref().to_path_buf(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Returns the dictionary for `version`, parsing it on first use
    pub fn load(&self, version: DdVersion) -> SchemaResult<Arc<DataDictionary>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(&version) {
            return cached.clone();
        }

        let result = self.read_version(version).map(Arc::new);
        let version_str = version.to_string();
        match &result {
            Ok(dictionary) => {
                let count = dictionary.dataset_names().count().to_string();
                log_event(
                    Event::SchemaLoaded,
                    &[("version", version_str.as_str()), ("datasets", count.as_str())],
                );
            }
            Err(e) => {
                let code = e.code().code();
                log_event(
                    Event::SchemaLoadFailed,
                    &[("version", version_str.as_str()), ("code", code), ("reason", e.message())],
                );
            }
        }
        cache.insert(version, result.clone());
        result
    }

    /// Parses `version` first; see [`SchemaLoader::load`]
    pub fn load_str(&self, version: &str) -> SchemaResult<Arc<DataDictionary>> {
        self.load(DdVersion::parse(version)?)
    }

    /// Returns the descriptor table of one dataset in one version
    pub fn dataset(&self, version: DdVersion, dataset: &str) -> SchemaResult<Arc<DatasetSchema>> {
        self.load(version)?.dataset(dataset)
    }

    /// Registers an already-built dictionary, replacing nothing
    pub fn register(&self, dictionary: DataDictionary) -> Arc<DataDictionary> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let version = dictionary.version();
        match cache.get(&version) {
            Some(Ok(existing)) => Arc::clone(existing),
            _ => {
                let shared = Arc::new(dictionary);
                cache.insert(version, Ok(Arc::clone(&shared)));
                shared
            }
        }
    }

    /// Versions with a schema document in the schema directory, ascending
    pub fn available_versions(&self) -> SchemaResult<Vec<DdVersion>> {
        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaError::malformed_schema(
                self.schema_dir.display().to_string(),
                format!("Failed to read schema directory: {}", e),
            )
        })?;

        let mut versions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            if let Some(version) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| DdVersion::parse(s).ok())
            {
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn read_version(&self, version: DdVersion) -> SchemaResult<DataDictionary> {
        let path = self.schema_dir.join(format!("{}.json", version));
        if !path.exists() {
            return Err(SchemaError::unknown_version(version.to_string()));
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            SchemaError::malformed_schema(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let dictionary = DataDictionary::from_json_str(&content, &path.display().to_string())?;
        if dictionary.version() != version {
            return Err(SchemaError::malformed_schema(
                path.display().to_string(),
                format!("document declares version {}", dictionary.version()),
            )
            .with_version(version.to_string()));
        }
        Ok(dictionary)
    }
}
