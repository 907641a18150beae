//! Columnar file -> tree
//!
//! Decoding runs in three steps:
//! 1. the mandatory time mode variable is read, since it decides every
//!    other variable's layout
//! 2. unless switched off, every variable is validated against the file's
//!    own dictionary version
//! 3. variables are resolved to target paths and written in target path
//!    order, so struct arrays are sized before their contents are filled
//!
//! Paths that the version map drops or marks as type-changed are skipped
//! with an informational log line. That data is not present in the result.

use std::sync::Arc;

use super::errors::{CodecError, CodecResult};
use super::grid::{extract, is_fill};
use super::layout::Layout;
use super::lazy::LazyDecoder;
use super::validate::validate;
use crate::columnar::{shape_table_name, DType, VariableData, VariableStore};
use crate::config::CodecConfig;
use crate::migration::{Resolution, VersionPathMap};
use crate::observability::{log_event, Event, ObservationScope};
use crate::schema::{DataKind, DatasetSchema, Descriptor};
use crate::tree::{Node, Structure, TimeMode, Toplevel, Value, TIME_MODE_PATH};

/// One stored variable and the node kind it fills in the target tree
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// Descriptor in the file's dictionary version; its path names the variable
    pub source: Arc<Descriptor>,
    /// Descriptor in the target dictionary version
    pub target: Arc<Descriptor>,
}

/// Reads trees out of a [`VariableStore`]
pub struct Decoder<S> {
    store: S,
    schema: Arc<DatasetSchema>,
    mode: TimeMode,
    config: CodecConfig,
}

impl<S: VariableStore> Decoder<S> {
    /// Opens `store` whose contents were written under `schema`.
    ///
    /// Reads and checks the time mode variable even when validation is off:
    /// nothing else can be interpreted without it.
    pub fn new(store: S, schema: Arc<DatasetSchema>, config: CodecConfig) -> CodecResult<Self> {
        if store.dataset() != schema.name() {
            return Err(CodecError::DatasetMismatch {
                expected: schema.name().to_string(),
                found: store.dataset().to_string(),
            });
        }
        if store.version() != schema.version() {
            return Err(CodecError::VersionMismatch {
                expected: schema.version().to_string(),
                found: store.version().to_string(),
            });
        }
        let mode = read_time_mode(&store)?;
        Ok(Self {
            store,
            schema,
            mode,
            config,
        })
    }

    pub fn time_mode(&self) -> TimeMode {
        self.mode
    }

    /// Dictionary the stored data was written under
    pub fn schema(&self) -> &Arc<DatasetSchema> {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> CodecConfig {
        self.config
    }

    /// Checks every stored variable against the file's dictionary
    pub fn validate(&self) -> CodecResult<()> {
        validate(&self.store, &self.schema, self.mode)
    }

    /// Validates, or warns that validation is switched off
    fn validate_or_warn(&self) -> CodecResult<()> {
        if self.config.validate {
            self.validate()
        } else {
            log_event(
                Event::ValidationDisabled,
                &[("dataset", self.schema.name()), ("reason", "disabled by configuration")],
            );
            Ok(())
        }
    }

    fn check_map(&self, target: &DatasetSchema, map: Option<&VersionPathMap>) -> CodecResult<()> {
        let Some(map) = map else {
            return Ok(());
        };
        let expected = format!(
            "{} {} -> {}",
            self.schema.name(),
            self.schema.version(),
            target.version()
        );
        let found = format!("{} {} -> {}", map.dataset(), map.from_version(), map.to_version());
        if expected != found {
            return Err(CodecError::PathMapMismatch { expected, found });
        }
        Ok(())
    }

    /// Resolves every stored variable against `target`, sorted by target path.
    ///
    /// Without a map, paths resolve to themselves when the target holds a
    /// node of the same kind and rank.
    pub fn plan(
        &self,
        target: &DatasetSchema,
        map: Option<&VersionPathMap>,
    ) -> CodecResult<Vec<PlanEntry>> {
        self.check_map(target, map)?;
        let mut plan = Vec::new();

        for name in self.store.variable_names() {
            if name.ends_with(":shape") {
                continue;
            }
            let Some(source) = self.schema.get(name) else {
                // only reachable with validation off
                continue;
            };
            if source.kind == DataKind::Structure || source.is_root() {
                continue;
            }

            let resolution = match map {
                Some(map) => map.resolve(name),
                None => resolve_same_path(source, target),
            };
            let target_path = match resolution {
                Resolution::Mapped(path) => path,
                Resolution::Dropped => {
                    log_event(Event::PathDropped, &[("path", name)]);
                    continue;
                }
                Resolution::TypeChanged => {
                    log_event(Event::PathTypeChanged, &[("path", name)]);
                    continue;
                }
            };
            let Some(target_descriptor) = target.get(&target_path) else {
                log_event(Event::PathDropped, &[("path", name)]);
                continue;
            };

            let source_depth = self.schema.aos_depth(name);
            let target_depth = target.aos_depth(&target_path);
            if source_depth != target_depth {
                let from = source_depth.to_string();
                let to = target_depth.to_string();
                log_event(
                    Event::PathDepthChanged,
                    &[
                        ("path", name),
                        ("target", target_path.as_str()),
                        ("from_depth", from.as_str()),
                        ("to_depth", to.as_str()),
                    ],
                );
                continue;
            }

            plan.push(PlanEntry {
                source: Arc::clone(source),
                target: Arc::clone(target_descriptor),
            });
        }

        plan.sort_by(|a, b| a.target.path.cmp(&b.target.path));
        Ok(plan)
    }

    /// Fills `ids` from the store
    pub fn decode_into(&self, ids: &Toplevel, map: Option<&VersionPathMap>) -> CodecResult<()> {
        self.validate_or_warn()?;
        let plan = self.plan(ids.schema(), map)?;

        for entry in &plan {
            self.prefetch(&entry.source)?;
            for (index, node) in instances(ids.root(), &entry.target.path)? {
                match node {
                    Node::StructArray(array) => {
                        array.resize(self.struct_array_size(&entry.source, &index)?)?;
                    }
                    Node::Leaf(leaf) => {
                        if let Some(value) = self.leaf_value(&entry.source, &index)? {
                            leaf.set_value(value)?;
                        }
                    }
                    Node::Structure(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Decodes everything into a fresh tree of `target`
    pub fn decode(
        &self,
        target: Arc<DatasetSchema>,
        map: Option<&VersionPathMap>,
    ) -> CodecResult<Toplevel> {
        let dataset = self.schema.name().to_string();
        let version = target.version().to_string();
        let scope = ObservationScope::with_fields(
            "DECODE",
            &[("dataset", dataset.as_str()), ("target_version", version.as_str())],
        );

        let ids = Toplevel::new(target);
        match self.decode_into(&ids, map) {
            Ok(()) => {
                scope.complete();
                Ok(ids)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Size of the struct array stored as `source` at parent position `index`
    pub(crate) fn struct_array_size(&self, source: &Descriptor, index: &[usize]) -> CodecResult<usize> {
        let name = source.path.as_str();
        let header = self
            .store
            .header(name)
            .ok_or_else(|| CodecError::invalid(name, "is not stored"))?;

        if header.is_sparse() {
            let table = shape_table_name(name);
            let size = match self.read_shape_row(&table, index, 1)?.as_slice() {
                [size] => *size,
                other => {
                    return Err(CodecError::invalid(
                        &table,
                        format!("row {:?} is not a single size", other),
                    ))
                }
            };
            return usize::try_from(size)
                .map_err(|_| CodecError::incorrect(&table, "size", size, None));
        }

        let dim = Layout::new(&self.schema, self.mode).aos_dimension(source);
        self.store.dimension(&dim).ok_or_else(|| {
            CodecError::invalid(name, format!("dimension '{}' is not declared", dim))
        })
    }

    /// Value stored for the leaf `source` at struct array position `index`,
    /// `None` when the file holds nothing there
    pub(crate) fn leaf_value(&self, source: &Descriptor, index: &[usize]) -> CodecResult<Option<Value>> {
        let name = source.path.as_str();
        let header = self
            .store
            .header(name)
            .ok_or_else(|| CodecError::invalid(name, "is not stored"))?;
        let shape = self.store.shape(name)?;
        if shape.len() != index.len() + source.ndim {
            return Err(CodecError::incorrect(
                name,
                "rank",
                shape.len(),
                Some((index.len() + source.ndim).to_string()),
            ));
        }
        let grid = &shape[index.len()..];

        let extents: Vec<usize> = if header.is_sparse() && source.ndim > 0 {
            let table = shape_table_name(name);
            let row = self.read_shape_row(&table, index, source.ndim)?;
            if row.iter().any(|&n| n <= 0) {
                return Ok(None);
            }
            row.into_iter().map(|n| n as usize).collect()
        } else {
            grid.to_vec()
        };

        let block = self.store.read_block(name, index)?;
        let value = extract(&block, grid, &[], &extents, source.kind)
            .map_err(|reason| CodecError::invalid(name, reason))?;
        if header.is_sparse() && source.ndim == 0 && is_fill(&value, header.fill_value()) {
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Loads what eager decoding of `source` reads, so every node's block
    /// is cut from memory instead of read on its own
    fn prefetch(&self, source: &Descriptor) -> CodecResult<()> {
        let name = source.path.as_str();
        if source.kind != DataKind::StructArray {
            self.store.read(name)?;
        }
        let table = shape_table_name(name);
        if self.store.contains(&table) {
            self.store.read(&table)?;
        }
        Ok(())
    }

    /// Realized extents of the instance at `index`, from shape table `name`
    fn read_shape_row(&self, name: &str, index: &[usize], ndim: usize) -> CodecResult<Vec<i32>> {
        let shape = self.store.shape(name)?;
        let row = self.store.read_block(name, index)?;
        match extract(&row, &shape[index.len()..], &[], &[ndim], DataKind::Int) {
            Ok(Value::IntArray(row)) => Ok(row.iter().copied().collect()),
            Ok(other) => Err(CodecError::incorrect(name, "data type", other.type_label(), None)),
            Err(reason) => Err(CodecError::invalid(name, reason)),
        }
    }
}

impl<S: VariableStore + 'static> Decoder<S> {
    /// Builds a tree of `target` that reads from the store on first access
    pub fn decode_lazy(
        self,
        target: Arc<DatasetSchema>,
        map: Option<&VersionPathMap>,
    ) -> CodecResult<Toplevel> {
        self.validate_or_warn()?;
        let plan = self.plan(&target, map)?;
        Ok(LazyDecoder::new(self, plan).into_toplevel(target))
    }
}

fn resolve_same_path(source: &Descriptor, target: &DatasetSchema) -> Resolution {
    match target.get(&source.path) {
        None => Resolution::Dropped,
        Some(t) if t.kind != source.kind || (t.kind.is_data() && t.ndim != source.ndim) => {
            Resolution::TypeChanged
        }
        Some(_) => Resolution::Mapped(source.path.clone()),
    }
}

/// Reads the mandatory time mode scalar
fn read_time_mode<S: VariableStore + ?Sized>(store: &S) -> CodecResult<TimeMode> {
    let header = store
        .header(TIME_MODE_PATH)
        .ok_or_else(|| CodecError::invalid(TIME_MODE_PATH, "mandatory variable does not exist"))?;
    if header.dtype != DType::I32 {
        return Err(CodecError::incorrect(
            TIME_MODE_PATH,
            "data type",
            header.dtype.as_str(),
            Some(DType::I32.as_str().to_string()),
        ));
    }
    if !header.dimensions.is_empty() {
        return Err(CodecError::incorrect(
            TIME_MODE_PATH,
            "dimensions",
            format!("{:?}", header.dimensions),
            Some("[]".to_string()),
        ));
    }
    let data = store.read(TIME_MODE_PATH)?;
    let value = match &*data {
        VariableData::Int(v) if v.len() == 1 => v[0],
        other => {
            return Err(CodecError::invalid(
                TIME_MODE_PATH,
                format!("holds {} elements, expected one", other.len()),
            ))
        }
    };
    TimeMode::try_from(value).map_err(|_| {
        CodecError::invalid(
            TIME_MODE_PATH,
            format!("invalid value {}, expected 0, 1 or 2", value),
        )
    })
}

/// Every node at schema path `path` under `root`, with its struct array
/// position
pub(crate) fn instances(root: &Structure, path: &str) -> CodecResult<Vec<(Vec<usize>, Node)>> {
    let segments: Vec<&str> = path.split('/').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(Vec::new());
    };

    let mut frontier: Vec<(Vec<usize>, Structure)> = vec![(Vec::new(), root.clone())];
    for name in parents {
        let mut next = Vec::with_capacity(frontier.len());
        for (index, structure) in frontier {
            match structure.child(name)? {
                Node::Structure(s) => next.push((index, s)),
                Node::StructArray(array) => {
                    for (i, element) in array.elements()?.into_iter().enumerate() {
                        let mut position = index.clone();
                        position.push(i);
                        next.push((position, element));
                    }
                }
                Node::Leaf(_) => {
                    return Err(CodecError::invalid(path, format!("'{}' is a leaf", name)));
                }
            }
        }
        frontier = next;
    }

    frontier
        .into_iter()
        .map(|(index, structure)| Ok((index, structure.child(last)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::columnar::{ColumnarFile, VariableHeader};
    use crate::schema::fixtures;

    fn schema() -> Arc<DatasetSchema> {
        fixtures::dictionary_v1().dataset("core_profiles").unwrap()
    }

    fn timed_profiles() -> Toplevel {
        let ids = Toplevel::new(schema());
        ids.set_time_mode(TimeMode::Heterogeneous).unwrap();
        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        profiles.resize(3).unwrap();
        for (i, element) in profiles.elements().unwrap().iter().enumerate() {
            element.leaf("time").unwrap().set_value(1.0 + i as f64).unwrap();
        }
        ids
    }

    #[test]
    fn test_struct_array_leaf_round_trip() {
        let file = encode(&timed_profiles()).unwrap();
        let decoder = Decoder::new(&file, schema(), CodecConfig::default()).unwrap();
        let ids = decoder.decode(schema(), None).unwrap();

        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        assert_eq!(profiles.len().unwrap(), 3);
        let times: Vec<f64> = profiles
            .elements()
            .unwrap()
            .iter()
            .map(|e| e.leaf("time").unwrap().as_f64().unwrap())
            .collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_time_mode_variable() {
        let file = ColumnarFile::new("core_profiles", schema().version());
        let err = Decoder::new(&file, schema(), CodecConfig::default()).err().unwrap();
        assert_eq!(err.variable(), Some(TIME_MODE_PATH));
    }

    #[test]
    fn test_invalid_time_mode_value() {
        let mut file = ColumnarFile::new("core_profiles", schema().version());
        file.add_variable(
            VariableHeader::new(TIME_MODE_PATH, DType::I32, Vec::new()),
            VariableData::Int(vec![3]),
        )
        .unwrap();
        let err = Decoder::new(&file, schema(), CodecConfig::default()).err().unwrap();
        assert!(err.to_string().contains("expected 0, 1 or 2"));
    }

    #[test]
    fn test_dataset_mismatch() {
        let file = ColumnarFile::new("equilibrium", schema().version());
        let err = Decoder::new(&file, schema(), CodecConfig::default()).err().unwrap();
        assert!(matches!(err, CodecError::DatasetMismatch { .. }));
    }

    #[test]
    fn test_ragged_nested_sizes_round_trip() {
        let ids = Toplevel::new(schema());
        ids.set_time_mode(TimeMode::Homogeneous).unwrap();
        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        profiles.resize(3).unwrap();
        for (i, n) in [2usize, 0, 4].into_iter().enumerate() {
            profiles.get(i).unwrap().struct_array("ion").unwrap().resize(n).unwrap();
        }
        let ion = profiles.get(2).unwrap().struct_array("ion").unwrap();
        ion.get(3).unwrap().leaf("z_ion").unwrap().set_value(2.0).unwrap();

        let file = encode(&ids).unwrap();
        let decoded = Decoder::new(&file, schema(), CodecConfig::default())
            .unwrap()
            .decode(schema(), None)
            .unwrap();

        let profiles = decoded.root().struct_array("profiles_1d").unwrap();
        let sizes: Vec<usize> = profiles
            .elements()
            .unwrap()
            .iter()
            .map(|p| p.struct_array("ion").unwrap().len().unwrap())
            .collect();
        assert_eq!(sizes, vec![2, 0, 4]);
        let z = decoded.get("profiles_1d[2]/ion[3]/z_ion").unwrap().into_leaf().unwrap();
        assert_eq!(z.as_f64().unwrap(), 2.0);
        let unset = decoded.get("profiles_1d[2]/ion[0]/z_ion").unwrap().into_leaf().unwrap();
        assert!(!unset.has_value().unwrap());
    }

    #[test]
    fn test_plan_is_sorted_by_target() {
        let file = encode(&timed_profiles()).unwrap();
        let decoder = Decoder::new(&file, schema(), CodecConfig::default()).unwrap();
        let plan = decoder.plan(&schema(), None).unwrap();
        let paths: Vec<&str> = plan.iter().map(|e| e.target.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["ids_properties/homogeneous_time", "profiles_1d", "profiles_1d/time"]
        );
    }

    #[test]
    fn test_instances_walks_struct_arrays() {
        let ids = timed_profiles();
        let found = instances(ids.root(), "profiles_1d/time").unwrap();
        let positions: Vec<Vec<usize>> = found.iter().map(|(i, _)| i.clone()).collect();
        assert_eq!(positions, vec![vec![0], vec![1], vec![2]]);
    }
}
