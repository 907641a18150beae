//! Tree -> columnar file
//!
//! Every struct array that holds at least one element and every leaf that
//! holds a value becomes one variable. Struct arrays are written as scalar
//! marker variables; their sizes are carried by their dimension, or by a
//! `:shape` table when they are ragged. Leaves are written over the full
//! grid of their dimensions, padded with the fill value.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::errors::{CodecError, CodecResult};
use super::grid::{place, ravel};
use super::layout::{rank_dimension, Layout};
use crate::columnar::{
    attrs, shape_table_name, ColumnarFile, DType, VariableData, VariableHeader,
};
use crate::observability::ObservationScope;
use crate::schema::{DatasetSchema, Descriptor};
use crate::tree::{Node, Structure, TimeMode, Toplevel, Value};

const SPARSE_LEAF: &str = "Sparse data, missing data is filled with _FillValue";
const SPARSE_SHAPES: &str = "Sparse data, data shapes are stored in the :shape table";

/// What a walk over the tree found, keyed by schema path
#[derive(Default)]
struct Collected {
    /// (struct array position, value) of every leaf holding a value
    leaves: BTreeMap<String, Vec<(Vec<usize>, Value)>>,
    /// (parent position, length) of every struct array instance
    arrays: BTreeMap<String, Vec<(Vec<usize>, usize)>>,
}

impl Collected {
    fn walk(&mut self, structure: &Structure, index: &mut Vec<usize>, mode: TimeMode) -> CodecResult<()> {
        for child in structure.children()? {
            if mode == TimeMode::Independent && child.descriptor().is_dynamic() {
                continue;
            }
            let path = child.descriptor().path.clone();
            match child {
                Node::Structure(s) => self.walk(&s, index, mode)?,
                Node::StructArray(array) => {
                    let elements = array.elements()?;
                    self.arrays
                        .entry(path)
                        .or_default()
                        .push((index.clone(), elements.len()));
                    for (i, element) in elements.iter().enumerate() {
                        index.push(i);
                        self.walk(element, index, mode)?;
                        index.pop();
                    }
                }
                Node::Leaf(leaf) => {
                    if leaf.has_value()? {
                        let value = leaf.value()?;
                        self.leaves.entry(path).or_default().push((index.clone(), value));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Dimension sizes, each the largest extent seen
#[derive(Default)]
struct Extents(BTreeMap<String, usize>);

impl Extents {
    fn grow(&mut self, dim: &str, size: usize) {
        let entry = self.0.entry(dim.to_string()).or_insert(0);
        *entry = (*entry).max(size);
    }

    fn sizes(&self, dims: &[String]) -> Vec<usize> {
        dims.iter().map(|d| self.0.get(d).copied().unwrap_or(0)).collect()
    }
}

struct Encoder<'a> {
    schema: &'a DatasetSchema,
    layout: Layout<'a>,
    collected: Collected,
    extents: Extents,
    file: ColumnarFile,
}

impl<'a> Encoder<'a> {
    fn descriptor(&self, path: &str) -> CodecResult<&'a Arc<Descriptor>> {
        Ok(self.schema.descriptor(path)?)
    }

    /// Sizes every dimension before any variable is written
    fn measure(&mut self) -> CodecResult<()> {
        for (path, instances) in &self.collected.arrays {
            let dim = self.layout.aos_dimension(self.descriptor(path)?);
            for (_, len) in instances {
                self.extents.grow(&dim, *len);
            }
        }
        for (path, values) in &self.collected.leaves {
            let descriptor = self.descriptor(path)?;
            for (_, value) in values {
                for (axis, extent) in value.shape().into_iter().enumerate() {
                    let dim = self.layout.axis_dimension(descriptor, axis);
                    self.extents.grow(&dim, extent);
                }
            }
        }
        Ok(())
    }

    fn declare(&mut self, dims: &[String]) -> CodecResult<Vec<usize>> {
        let sizes = self.extents.sizes(dims);
        for (dim, size) in dims.iter().zip(&sizes) {
            self.file.add_dimension(dim, *size)?;
        }
        Ok(sizes)
    }

    /// True when the instances do not fill the whole grid
    fn is_ragged(grid: &[usize], extents: &[usize], instances: usize, full: &[Vec<usize>]) -> bool {
        let cells: usize = grid.iter().product();
        instances != cells || full.iter().any(|shape| shape.as_slice() != extents)
    }

    fn write_shape_table(
        &mut self,
        variable: &str,
        descriptor: &Descriptor,
        grid: &[usize],
        shapes: &[(Vec<usize>, Vec<usize>)],
    ) -> CodecResult<()> {
        let mut dims = self.layout.aos_dimensions(&descriptor.path);
        let rank_dim = rank_dimension(descriptor.ndim);
        dims.push(rank_dim.clone());
        self.extents.grow(&rank_dim, descriptor.ndim);
        let sizes = self.declare(&dims)?;

        let mut table = vec![0i32; sizes.iter().product()];
        for (index, shape) in shapes {
            for (axis, extent) in shape.iter().enumerate() {
                let mut cell = index.clone();
                cell.push(axis);
                let slot = ravel(&cell, &sizes).and_then(|offset| table.get_mut(offset));
                match (slot, i32::try_from(*extent)) {
                    (Some(slot), Ok(extent)) => *slot = extent,
                    _ => {
                        return Err(CodecError::invalid(
                            variable,
                            format!(
                                "cannot record shape {:?} at {:?} in grid {:?}",
                                shape, index, grid
                            ),
                        ))
                    }
                }
            }
        }
        let header = VariableHeader::new(shape_table_name(variable), DType::I32, dims);
        self.file.add_variable(header, VariableData::Int(table))?;
        Ok(())
    }

    fn write_struct_array(&mut self, path: &str) -> CodecResult<()> {
        let descriptor = Arc::clone(self.descriptor(path)?);
        let instances = self.collected.arrays.get(path).cloned().unwrap_or_default();
        if instances.iter().all(|(_, len)| *len == 0) {
            return Ok(());
        }

        let own_dim = self.layout.aos_dimension(&descriptor);
        let parent_dims = self.layout.aos_dimensions(path);
        let grid = self.declare(&parent_dims)?;
        let size = self.declare(std::slice::from_ref(&own_dim))?;
        let shapes: Vec<Vec<usize>> = instances.iter().map(|(_, len)| vec![*len]).collect();
        let sparse = Self::is_ragged(&grid, &size, instances.len(), &shapes);

        let mut header = VariableHeader::new(path, DType::Str, Vec::new())
            .with_attr(attrs::DOCUMENTATION, descriptor.documentation.as_str());
        if !descriptor.units.is_empty() {
            header = header.with_attr(attrs::UNITS, descriptor.units.as_str());
        }
        if sparse {
            header = header.with_attr(attrs::SPARSE, SPARSE_SHAPES);
            let shapes: Vec<(Vec<usize>, Vec<usize>)> = instances
                .iter()
                .map(|(index, len)| (index.clone(), vec![*len]))
                .collect();
            self.write_shape_table(path, &descriptor, &grid, &shapes)?;
        }
        self.file
            .add_variable(header, VariableData::Str(vec![String::new()]))?;
        Ok(())
    }

    fn write_leaf(&mut self, path: &str, ancillary: &[String]) -> CodecResult<()> {
        let descriptor = Arc::clone(self.descriptor(path)?);
        let dtype = DType::for_kind(descriptor.kind)
            .ok_or_else(|| CodecError::invalid(path, "not a data node"))?;
        let values = self.collected.leaves.get(path).cloned().unwrap_or_default();

        let aos_dims = self.layout.aos_dimensions(path);
        let dims = self.layout.dimensions(&descriptor);
        let sizes = self.declare(&dims)?;
        let (grid, extents) = sizes.split_at(aos_dims.len());

        let shapes: Vec<Vec<usize>> = values.iter().map(|(_, v)| v.shape()).collect();
        let sparse = Self::is_ragged(grid, extents, values.len(), &shapes);

        let mut data = VariableData::filled(dtype, sizes.iter().product());
        for (index, value) in &values {
            if !place(&mut data, &sizes, index, value) {
                return Err(CodecError::invalid(
                    path,
                    format!(
                        "{} value at {:?} does not fit the grid {:?}",
                        value.type_label(),
                        index,
                        sizes
                    ),
                ));
            }
        }

        let mut header = VariableHeader::new(path, dtype, dims)
            .with_attr(attrs::FILL_VALUE, dtype.fill_value())
            .with_attr(attrs::DOCUMENTATION, descriptor.documentation.as_str());
        if !descriptor.units.is_empty() {
            header = header.with_attr(attrs::UNITS, descriptor.units.as_str());
        }
        let coordinates = self.layout.coordinates(&descriptor);
        if !coordinates.is_empty() {
            header = header.with_attr(attrs::COORDINATES, coordinates.join(" ").as_str());
        }
        if !ancillary.is_empty() {
            header = header.with_attr(attrs::ANCILLARY_VARIABLES, ancillary.join(" ").as_str());
        }
        if sparse {
            header = header.with_attr(attrs::SPARSE, SPARSE_LEAF);
            if descriptor.ndim > 0 {
                let shapes: Vec<(Vec<usize>, Vec<usize>)> =
                    values.iter().map(|(i, v)| (i.clone(), v.shape())).collect();
                self.write_shape_table(path, &descriptor, grid, &shapes)?;
            }
        }
        self.file.add_variable(header, data)?;
        Ok(())
    }
}

/// Error bar variables written next to `path`
fn ancillary_variables(path: &str, written: &BTreeSet<&str>) -> Vec<String> {
    ["_error_upper", "_error_lower"]
        .iter()
        .map(|suffix| format!("{}{}", path, suffix))
        .filter(|name| written.contains(name.as_str()))
        .collect()
}

/// Encodes `ids` into an in-memory columnar file.
///
/// The time mode must be set: it decides how time-dependent data is
/// dimensioned, and independent datasets drop their dynamic nodes.
pub fn encode(ids: &Toplevel) -> CodecResult<ColumnarFile> {
    let name = ids.name().to_string();
    let version = ids.version().to_string();
    let scope = ObservationScope::with_fields(
        "ENCODE",
        &[("dataset", name.as_str()), ("dd_version", version.as_str())],
    );

    match encode_tree(ids) {
        Ok(file) => {
            let variables = file.len().to_string();
            scope.complete_with_fields(&[("variables", variables.as_str())]);
            Ok(file)
        }
        Err(e) => {
            scope.fail(&e.to_string());
            Err(e)
        }
    }
}

fn encode_tree(ids: &Toplevel) -> CodecResult<ColumnarFile> {
    let mode = ids.time_mode()?.ok_or(CodecError::MissingTimeMode)?;
    let schema = Arc::clone(ids.schema());

    let mut collected = Collected::default();
    collected.walk(ids.root(), &mut Vec::new(), mode)?;

    let mut encoder = Encoder {
        schema: &schema,
        layout: Layout::new(&schema, mode),
        collected,
        extents: Extents::default(),
        file: ColumnarFile::new(schema.name(), schema.version()),
    };
    encoder.measure()?;

    let arrays: Vec<String> = encoder.collected.arrays.keys().cloned().collect();
    for path in &arrays {
        encoder.write_struct_array(path)?;
    }

    let leaves: Vec<String> = encoder.collected.leaves.keys().cloned().collect();
    let written: BTreeSet<&str> = leaves.iter().map(String::as_str).collect();
    for path in &leaves {
        let ancillary = ancillary_variables(path, &written);
        encoder.write_leaf(path, &ancillary)?;
    }

    Ok(encoder.file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::{AttrValue, VariableStore};
    use crate::schema::fixtures;

    fn toplevel(mode: TimeMode) -> Toplevel {
        let ids = Toplevel::new(fixtures::dictionary_v1().dataset("core_profiles").unwrap());
        ids.set_time_mode(mode).unwrap();
        ids
    }

    #[test]
    fn test_missing_time_mode() {
        let ids = Toplevel::new(fixtures::dictionary_v1().dataset("core_profiles").unwrap());
        assert!(matches!(encode(&ids), Err(CodecError::MissingTimeMode)));
    }

    #[test]
    fn test_time_mode_is_always_written() {
        let file = encode(&toplevel(TimeMode::Heterogeneous)).unwrap();
        let header = file.header("ids_properties/homogeneous_time").unwrap();
        assert_eq!(header.dtype, DType::I32);
        assert!(header.dimensions.is_empty());
        assert_eq!(
            *file.read("ids_properties/homogeneous_time").unwrap(),
            VariableData::Int(vec![0])
        );
    }

    #[test]
    fn test_regular_struct_array_has_no_shape_table() {
        let ids = toplevel(TimeMode::Homogeneous);
        ids.set("time", vec![0.0f64, 1.0, 2.0]).unwrap();
        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        profiles.resize(3).unwrap();
        for (i, element) in profiles.elements().unwrap().iter().enumerate() {
            element.leaf("time").unwrap().set_value(i as f64).unwrap();
        }

        let file = encode(&ids).unwrap();
        assert_eq!(file.dimension("time"), Some(3));
        assert!(!file.header("profiles_1d").unwrap().is_sparse());
        assert!(!file.contains("profiles_1d:shape"));
        assert_eq!(
            *file.read("profiles_1d/time").unwrap(),
            VariableData::Float(vec![0.0, 1.0, 2.0])
        );
    }

    #[test]
    fn test_ragged_struct_array_writes_shapes() {
        let ids = toplevel(TimeMode::Heterogeneous);
        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        profiles.resize(2).unwrap();
        profiles.get(0).unwrap().struct_array("ion").unwrap().resize(1).unwrap();
        profiles.get(1).unwrap().struct_array("ion").unwrap().resize(3).unwrap();

        let file = encode(&ids).unwrap();
        let ion = file.header("profiles_1d/ion").unwrap();
        assert!(ion.is_sparse());
        let shape = file.header("profiles_1d/ion:shape").unwrap();
        assert_eq!(shape.dimensions, vec!["profiles_1d:i", "1D"]);
        assert_eq!(*file.read("profiles_1d/ion:shape").unwrap(), VariableData::Int(vec![1, 3]));
        assert_eq!(file.dimension("profiles_1d/ion:i"), Some(3));
    }

    #[test]
    fn test_partial_scalar_leaf_uses_fill_value() {
        let ids = toplevel(TimeMode::Heterogeneous);
        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        profiles.resize(3).unwrap();
        profiles.get(1).unwrap().leaf("zeff_flag").unwrap().set_value(4).unwrap();

        let file = encode(&ids).unwrap();
        let header = file.header("profiles_1d/zeff_flag").unwrap();
        assert!(header.is_sparse());
        assert_eq!(header.fill_value(), Some(&AttrValue::Int(crate::tree::EMPTY_INT)));
        assert!(!file.contains("profiles_1d/zeff_flag:shape"));
        let fill = crate::tree::EMPTY_INT;
        assert_eq!(
            *file.read("profiles_1d/zeff_flag").unwrap(),
            VariableData::Int(vec![fill, 4, fill])
        );
    }

    #[test]
    fn test_leaf_attributes() {
        let ids = toplevel(TimeMode::Homogeneous);
        ids.set("time", vec![0.0f64, 1.0]).unwrap();
        ids.set("global_quantities/ip", vec![1.0f64, 2.0]).unwrap();
        ids.set("global_quantities/ip_error_upper", vec![0.1f64, 0.2]).unwrap();

        let file = encode(&ids).unwrap();
        let ip = file.header("global_quantities/ip").unwrap();
        assert_eq!(ip.attr_str(attrs::UNITS), Some("A"));
        assert_eq!(ip.attr_str(attrs::COORDINATES), Some("time"));
        assert_eq!(
            ip.attr_str(attrs::ANCILLARY_VARIABLES),
            Some("global_quantities/ip_error_upper")
        );
        assert_eq!(ip.attr_str(attrs::DOCUMENTATION), Some("Total plasma current"));
        assert!(!ip.is_sparse());
    }

    #[test]
    fn test_independent_mode_skips_dynamic_nodes() {
        let ids = toplevel(TimeMode::Independent);
        ids.set("time", vec![0.0f64]).unwrap();
        ids.set("ids_properties/comment", "static").unwrap();
        let file = encode(&ids).unwrap();
        assert!(!file.contains("time"));
        assert!(file.contains("ids_properties/comment"));
    }

    #[test]
    fn test_unset_leaves_are_not_written() {
        let ids = toplevel(TimeMode::Heterogeneous);
        ids.root().struct_array("profiles_1d").unwrap().resize(2).unwrap();
        let file = encode(&ids).unwrap();
        assert!(file.contains("profiles_1d"));
        assert!(!file.contains("profiles_1d/time"));
    }
}
