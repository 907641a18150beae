//! Per-version descriptor tables
//!
//! A [`DataDictionary`] is the parsed form of one schema document. Each of its
//! datasets is a [`DatasetSchema`]: a read-only table of [`Descriptor`]s
//! addressable by path, with a per-parent child index so that child lookups
//! during tree materialization never allocate.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::{DataKind, DatasetDef, Descriptor, DictionaryDef, Lifecycle, NodeDef};
use super::version::DdVersion;

/// Descriptor table for one dataset in one dictionary version
#[derive(Debug)]
pub struct DatasetSchema {
    name: String,
    version: DdVersion,
    descriptors: HashMap<String, Arc<Descriptor>>,
    child_index: HashMap<String, HashMap<String, Arc<Descriptor>>>,
    /// All paths in sorted order, root excluded
    paths: Vec<String>,
}

impl DatasetSchema {
    fn from_def(def: &DatasetDef, version: DdVersion) -> SchemaResult<Self> {
        let mut builder = Builder {
            version,
            descriptors: HashMap::new(),
        };

        let root = Descriptor {
            path: String::new(),
            name: def.name.clone(),
            kind: DataKind::Structure,
            ndim: 0,
            units: String::new(),
            coordinates: Vec::new(),
            documentation: def.documentation.clone(),
            lifecycle: Lifecycle::Static,
            is_sparse: false,
            identifier_enum: None,
            nbc: Vec::new(),
            children: def.children.iter().map(|c| c.name.clone()).collect(),
        };
        builder.insert(root)?;

        for child in &def.children {
            builder.add_node(child, "", false)?;
        }

        let descriptors = builder.descriptors;
        let mut child_index: HashMap<String, HashMap<String, Arc<Descriptor>>> = HashMap::new();
        for descriptor in descriptors.values() {
            if let Some(parent) = descriptor.parent_path() {
                child_index
                    .entry(parent.to_string())
                    .or_default()
                    .insert(descriptor.name.clone(), Arc::clone(descriptor));
            }
        }

        let mut paths: Vec<String> = descriptors
            .keys()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect();
        paths.sort();

        Ok(Self {
            name: def.name.clone(),
            version,
            descriptors,
            child_index,
            paths,
        })
    }

    /// Dataset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dictionary version this table was built from
    pub fn version(&self) -> DdVersion {
        self.version
    }

    /// Descriptor of the dataset root
    pub fn root(&self) -> &Arc<Descriptor> {
        // The root is inserted unconditionally in from_def
        &self.descriptors[""]
    }

    /// Looks up a descriptor by path
    pub fn get(&self, path: &str) -> Option<&Arc<Descriptor>> {
        self.descriptors.get(path)
    }

    /// Looks up a descriptor by path, failing with `UnknownPath`
    pub fn descriptor(&self, path: &str) -> SchemaResult<&Arc<Descriptor>> {
        self.get(path)
            .ok_or_else(|| SchemaError::unknown_path(&self.name, path).with_version(self.version.to_string()))
    }

    /// Looks up a direct child of `parent_path` by name
    pub fn child(&self, parent_path: &str, name: &str) -> Option<&Arc<Descriptor>> {
        self.child_index.get(parent_path).and_then(|c| c.get(name))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.descriptors.contains_key(path)
    }

    /// All node paths, sorted, root excluded
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Descriptors in sorted path order, root excluded
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.paths.iter().map(move |p| &self.descriptors[p])
    }

    /// Struct-array ancestors of `path`, outermost first, excluding `path` itself
    pub fn aos_ancestors(&self, path: &str) -> Vec<Arc<Descriptor>> {
        let mut ancestors = Vec::new();
        let mut current = self.get(path).and_then(|d| d.parent_path());
        while let Some(parent) = current {
            match self.get(parent) {
                Some(descriptor) => {
                    if descriptor.kind == DataKind::StructArray {
                        ancestors.push(Arc::clone(descriptor));
                    }
                    current = descriptor.parent_path();
                }
                None => break,
            }
        }
        ancestors.reverse();
        ancestors
    }

    /// Number of struct arrays enclosing `path`
    pub fn aos_depth(&self, path: &str) -> usize {
        self.aos_ancestors(path).len()
    }
}

struct Builder {
    version: DdVersion,
    descriptors: HashMap<String, Arc<Descriptor>>,
}

impl Builder {
    fn insert(&mut self, descriptor: Descriptor) -> SchemaResult<()> {
        if self.descriptors.contains_key(&descriptor.path) {
            return Err(SchemaError::duplicate_path(&descriptor.path)
                .with_version(self.version.to_string()));
        }
        self.descriptors
            .insert(descriptor.path.clone(), Arc::new(descriptor));
        Ok(())
    }

    fn add_node(&mut self, def: &NodeDef, parent_path: &str, inside_aos: bool) -> SchemaResult<()> {
        if def.name.is_empty() || def.name.contains('/') {
            return Err(SchemaError::malformed_schema(
                format!("dd {}", self.version),
                format!("invalid node name '{}' under '{}'", def.name, parent_path),
            ));
        }

        let path = if parent_path.is_empty() {
            def.name.clone()
        } else {
            format!("{}/{}", parent_path, def.name)
        };

        let (kind, ndim) = DataKind::parse(&def.data_type).ok_or_else(|| {
            SchemaError::unknown_data_type(&path, &def.data_type).with_version(self.version.to_string())
        })?;

        if kind.is_data() && !def.children.is_empty() {
            return Err(SchemaError::malformed_schema(
                format!("dd {}", self.version),
                format!("data node '{}' cannot have children", path),
            ));
        }

        let coordinates: Vec<String> = def.coordinates.iter().map(|c| normalize_coordinate(c)).collect();
        let is_time_dependent = coordinates
            .first()
            .map(|c| super::types::is_time_coordinate(c))
            .unwrap_or(false);
        let is_sparse =
            kind == DataKind::StructArray && (def.sparse || inside_aos || is_time_dependent);

        let descriptor = Descriptor {
            path: path.clone(),
            name: def.name.clone(),
            kind,
            ndim,
            units: def.units.clone(),
            coordinates,
            documentation: def.documentation.clone(),
            lifecycle: def.lifecycle,
            is_sparse,
            identifier_enum: def.identifier_enum.clone(),
            nbc: def.nbc.clone(),
            children: def.children.iter().map(|c| c.name.clone()).collect(),
        };
        self.insert(descriptor)?;

        let child_inside_aos = inside_aos || kind == DataKind::StructArray;
        for child in &def.children {
            self.add_node(child, &path, child_inside_aos)?;
        }
        Ok(())
    }
}

/// Strips index markers such as `(itime)` from a coordinate reference
fn normalize_coordinate(coordinate: &str) -> String {
    let mut out = String::with_capacity(coordinate.len());
    let mut depth = 0usize;
    for c in coordinate.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// A parsed Data Dictionary version
#[derive(Debug)]
pub struct DataDictionary {
    version: DdVersion,
    datasets: BTreeMap<String, Arc<DatasetSchema>>,
}

impl DataDictionary {
    /// Builds descriptor tables for every dataset in a schema document
    pub fn from_def(def: &DictionaryDef) -> SchemaResult<Self> {
        let mut datasets = BTreeMap::new();
        for dataset in &def.datasets {
            if datasets.contains_key(&dataset.name) {
                return Err(SchemaError::duplicate_path(&dataset.name)
                    .with_version(def.version.to_string()));
            }
            let schema = DatasetSchema::from_def(dataset, def.version)?;
            datasets.insert(dataset.name.clone(), Arc::new(schema));
        }
        Ok(Self {
            version: def.version,
            datasets,
        })
    }

    /// Parses a JSON schema document
    pub fn from_json_str(json: &str, source: &str) -> SchemaResult<Self> {
        let def: DictionaryDef = serde_json::from_str(json)
            .map_err(|e| SchemaError::malformed_schema(source, format!("Invalid JSON: {}", e)))?;
        Self::from_def(&def)
    }

    pub fn version(&self) -> DdVersion {
        self.version
    }

    /// Returns the descriptor table of one dataset
    pub fn dataset(&self, name: &str) -> SchemaResult<Arc<DatasetSchema>> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::unknown_dataset(self.version.to_string(), name))
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures;
    use crate::schema::SchemaErrorCode;

    fn core_profiles() -> Arc<DatasetSchema> {
        fixtures::dictionary_v1().dataset("core_profiles").unwrap()
    }

    #[test]
    fn test_lookup_by_path() {
        let schema = core_profiles();
        let desc = schema.descriptor("profiles_1d/grid/rho_tor_norm").unwrap();
        assert_eq!(desc.kind, DataKind::Flt);
        assert_eq!(desc.ndim, 1);
        assert_eq!(desc.name, "rho_tor_norm");
        assert_eq!(desc.parent_path(), Some("profiles_1d/grid"));
    }

    #[test]
    fn test_child_lookup() {
        let schema = core_profiles();
        let child = schema.child("profiles_1d", "ion").unwrap();
        assert_eq!(child.path, "profiles_1d/ion");
        assert!(schema.child("profiles_1d", "nope").is_none());
        assert_eq!(schema.child("", "time").unwrap().path, "time");
    }

    #[test]
    fn test_every_parent_is_a_valid_path() {
        let schema = core_profiles();
        for descriptor in schema.descriptors() {
            let parent = descriptor.parent_path().unwrap();
            assert!(schema.contains(parent), "missing parent of {}", descriptor.path);
        }
    }

    #[test]
    fn test_paths_sorted_and_unique() {
        let schema = core_profiles();
        let paths = schema.paths();
        for pair in paths.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_sparsity_derivation() {
        let schema = core_profiles();
        // time-dependent top-level array
        assert!(schema.descriptor("profiles_1d").unwrap().is_sparse);
        // nested array
        assert!(schema.descriptor("profiles_1d/ion").unwrap().is_sparse);
        // plain top-level array
        assert!(!schema.descriptor("code/library").unwrap().is_sparse);
    }

    #[test]
    fn test_aos_ancestors() {
        let schema = core_profiles();
        let ancestors = schema.aos_ancestors("profiles_1d/ion/element/z_n");
        let paths: Vec<&str> = ancestors.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["profiles_1d", "profiles_1d/ion", "profiles_1d/ion/element"]);
        assert_eq!(schema.aos_depth("time"), 0);
    }

    #[test]
    fn test_coordinates_are_normalized() {
        let schema = core_profiles();
        let desc = schema.descriptor("profiles_1d/electrons/temperature").unwrap();
        assert_eq!(desc.coordinates, vec!["profiles_1d/grid/rho_tor_norm".to_string()]);
    }

    #[test]
    fn test_unknown_data_type_fails() {
        let json = r#"{"version": "1.0.0", "datasets": [
            {"name": "ds", "children": [{"name": "x", "data_type": "BOOL_0D"}]}
        ]}"#;
        let err = DataDictionary::from_json_str(json, "inline").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnknownDataType);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_duplicate_path_fails() {
        let json = r#"{"version": "1.0.0", "datasets": [
            {"name": "ds", "children": [
                {"name": "x", "data_type": "INT_0D"},
                {"name": "x", "data_type": "FLT_0D"}
            ]}
        ]}"#;
        let err = DataDictionary::from_json_str(json, "inline").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::DuplicatePath);
    }

    #[test]
    fn test_data_node_with_children_fails() {
        let json = r#"{"version": "1.0.0", "datasets": [
            {"name": "ds", "children": [
                {"name": "x", "data_type": "INT_0D", "children": [{"name": "y", "data_type": "INT_0D"}]}
            ]}
        ]}"#;
        let err = DataDictionary::from_json_str(json, "inline").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedSchema);
    }

    #[test]
    fn test_invalid_json_fails() {
        let err = DataDictionary::from_json_str("{not json", "inline").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedSchema);
    }

    #[test]
    fn test_unknown_dataset() {
        let dd = fixtures::dictionary_v1();
        let err = dd.dataset("equilibrium").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnknownDataset);
    }

    #[test]
    fn test_normalize_coordinate() {
        assert_eq!(normalize_coordinate("profiles_1d(itime)/time"), "profiles_1d/time");
        assert_eq!(normalize_coordinate("1...N"), "1...N");
    }
}
