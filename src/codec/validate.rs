//! Pre-decode validation
//!
//! Checks every stored variable against what the dictionary and the time
//! mode predict: dtype, dimensions, coordinates, error-bar references,
//! units, sparsity and attributes. A documentation mismatch only warns.
//! `:shape` tables must belong to a stored sparse variable.

use std::collections::BTreeMap;

use super::errors::{CodecError, CodecResult};
use super::layout::Layout;
use crate::columnar::{attrs, AttrValue, DType, VariableHeader, VariableStore};
use crate::observability::{log_event, Event};
use crate::schema::{DataKind, DatasetSchema, Descriptor};
use crate::tree::TimeMode;

const SHAPE_SUFFIX: &str = ":shape";

/// Validates every variable of `store`
pub fn validate<S: VariableStore + ?Sized>(
    store: &S,
    schema: &DatasetSchema,
    mode: TimeMode,
) -> CodecResult<()> {
    let validator = Validator::new(store, schema, mode);
    for name in store.variable_names() {
        if let Some(data_var) = name.strip_suffix(SHAPE_SUFFIX) {
            validator.check_shape_owner(name, data_var)?;
            continue;
        }
        let descriptor = schema
            .get(name)
            .filter(|d| !d.is_root())
            .ok_or_else(|| {
                CodecError::invalid(
                    name,
                    format!("no such variable exists in the {} dataset", schema.name()),
                )
            })?;
        let header = store
            .header(name)
            .ok_or_else(|| CodecError::invalid(name, "listed but has no header"))?;
        validator.check_variable(header, descriptor)?;
    }
    Ok(())
}

pub(crate) struct Validator<'a, S: ?Sized> {
    store: &'a S,
    layout: Layout<'a>,
}

impl<'a, S: VariableStore + ?Sized> Validator<'a, S> {
    pub(crate) fn new(store: &'a S, schema: &'a DatasetSchema, mode: TimeMode) -> Self {
        Self {
            store,
            layout: Layout::new(schema, mode),
        }
    }

    fn check_shape_owner(&self, name: &str, data_var: &str) -> CodecResult<()> {
        match self.store.header(data_var) {
            None => Err(CodecError::invalid(
                name,
                format!("shape information provided for non-existing {}", data_var),
            )),
            Some(header) if !header.is_sparse() => Err(CodecError::invalid(
                name,
                format!(
                    "shape information provided for {}, but this variable is not sparse",
                    data_var
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Checks one variable against its descriptor
    pub(crate) fn check_variable(
        &self,
        header: &VariableHeader,
        descriptor: &Descriptor,
    ) -> CodecResult<()> {
        let name = header.name.as_str();
        let mut attributes: BTreeMap<String, AttrValue> = header.attributes.clone();
        attributes.remove(attrs::FILL_VALUE);

        if descriptor.kind.is_data() {
            if let Some(expected) = DType::for_kind(descriptor.kind) {
                if header.dtype != expected {
                    return Err(CodecError::incorrect(
                        name,
                        "data type",
                        header.dtype.as_str(),
                        Some(expected.as_str().to_string()),
                    ));
                }
            }

            let expected_dims = self.layout.dimensions(descriptor);
            if header.dimensions != expected_dims {
                return Err(CodecError::incorrect(
                    name,
                    "dimensions",
                    format!("{:?}", header.dimensions),
                    Some(format!("{:?}", expected_dims)),
                ));
            }

            let coordinates = text(attributes.remove(attrs::COORDINATES));
            let expected_coordinates = self.layout.coordinates(descriptor);
            if coordinates
                .split_whitespace()
                .any(|c| !expected_coordinates.iter().any(|e| e == c))
            {
                return Err(CodecError::incorrect(
                    name,
                    "coordinates",
                    coordinates,
                    Some(expected_coordinates.join(" ")),
                ));
            }

            let ancillary = text(attributes.remove(attrs::ANCILLARY_VARIABLES));
            let allowed = [format!("{}_error_upper", name), format!("{}_error_lower", name)];
            if ancillary
                .split_whitespace()
                .any(|v| !allowed.iter().any(|a| a == v))
            {
                return Err(CodecError::incorrect(
                    name,
                    "ancillary_variables",
                    ancillary,
                    Some(allowed.join(" ")),
                ));
            }
        } else if !header.dimensions.is_empty() {
            return Err(CodecError::incorrect(
                name,
                "dimensions",
                format!("{:?}", header.dimensions),
                Some("[]".to_string()),
            ));
        }

        let units = attributes.remove(attrs::UNITS);
        if !descriptor.units.is_empty()
            && units.as_ref().and_then(AttrValue::as_str) != Some(descriptor.units.as_str())
        {
            return Err(CodecError::incorrect(
                name,
                "units",
                units.as_ref().and_then(AttrValue::as_str).unwrap_or("<none>"),
                Some(descriptor.units.clone()),
            ));
        }

        if attributes.remove(attrs::SPARSE).is_some() {
            self.check_sparsity(name, descriptor)?;
        }

        let documentation = attributes.remove(attrs::DOCUMENTATION);
        let documented = documentation.as_ref().and_then(AttrValue::as_str);
        if documented != Some(descriptor.documentation.as_str()) {
            log_event(Event::DocumentationMismatch, &[("variable", name)]);
        }

        if !attributes.is_empty() {
            let unknown: Vec<&str> = attributes.keys().map(String::as_str).collect();
            return Err(CodecError::incorrect(name, "attributes", unknown.join(", "), None));
        }
        Ok(())
    }

    fn check_sparsity(&self, name: &str, descriptor: &Descriptor) -> CodecResult<()> {
        if descriptor.kind == DataKind::StructArray && !descriptor.is_sparse {
            return Err(CodecError::invalid(
                name,
                "is marked sparse but the dictionary does not allow a ragged struct array here",
            ));
        }
        if descriptor.kind.is_data() && descriptor.ndim == 0 {
            // scalars mark missing entries with the fill value only
            return Ok(());
        }

        let shape_name = format!("{}{}", name, SHAPE_SUFFIX);
        let shape = self.store.header(&shape_name).ok_or_else(|| {
            CodecError::invalid(name, format!("is sparse but {} does not exist", shape_name))
        })?;

        let aos_dims = self.layout.aos_dimensions(&descriptor.path);
        let expected = self.layout.shape_dimensions(descriptor);
        let dims = &shape.dimensions;
        let last_size = dims.last().and_then(|d| self.store.dimension(d));
        if dims.len() != aos_dims.len() + 1
            || dims[..dims.len() - 1] != aos_dims[..]
            || last_size != Some(descriptor.ndim)
        {
            return Err(CodecError::incorrect(
                &shape_name,
                "dimensions",
                format!("{:?}", dims),
                Some(format!("{:?}", expected)),
            ));
        }

        if shape.dtype != DType::I32 {
            return Err(CodecError::incorrect(
                &shape_name,
                "dtype",
                shape.dtype.as_str(),
                Some("any integer type".to_string()),
            ));
        }
        Ok(())
    }
}

fn text(value: Option<AttrValue>) -> String {
    match value {
        Some(AttrValue::Str(s)) => s,
        Some(other) => format!("{:?}", other),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::columnar::{ColumnarFile, VariableData};
    use crate::schema::fixtures;
    use crate::tree::Toplevel;
    use std::sync::Arc;

    fn schema() -> Arc<DatasetSchema> {
        fixtures::dictionary_v1().dataset("core_profiles").unwrap()
    }

    fn populated() -> ColumnarFile {
        let ids = Toplevel::new(schema());
        ids.set_time_mode(TimeMode::Homogeneous).unwrap();
        ids.set("time", vec![0.0f64, 1.0]).unwrap();
        ids.set("global_quantities/ip", vec![1.0f64, 2.0]).unwrap();
        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        profiles.resize(2).unwrap();
        profiles.get(0).unwrap().struct_array("ion").unwrap().resize(2).unwrap();
        profiles.get(1).unwrap().struct_array("ion").unwrap().resize(1).unwrap();
        profiles
            .get(0)
            .unwrap()
            .get("grid/rho_tor_norm")
            .unwrap()
            .into_leaf()
            .unwrap()
            .set_value(vec![0.0f64, 0.5, 1.0])
            .unwrap();
        encode(&ids).unwrap()
    }

    fn replace_header(file: &mut ColumnarFile, name: &str, f: impl FnOnce(&mut VariableHeader)) {
        let variable = file.variable_mut(name).unwrap();
        f(&mut variable.header);
    }

    #[test]
    fn test_encoded_file_validates() {
        let file = populated();
        validate(&file, &schema(), TimeMode::Homogeneous).unwrap();
    }

    #[test]
    fn test_wrong_time_mode_fails_dimensions() {
        let file = populated();
        let err = validate(&file, &schema(), TimeMode::Heterogeneous).unwrap_err();
        assert!(err.to_string().contains("dimensions"), "{}", err);
    }

    #[test]
    fn test_unknown_variable() {
        let mut file = populated();
        file.add_variable(
            VariableHeader::new("not_in_dd", DType::F64, Vec::new()),
            VariableData::Float(vec![1.0]),
        )
        .unwrap();
        let err = validate(&file, &schema(), TimeMode::Homogeneous).unwrap_err();
        assert_eq!(err.variable(), Some("not_in_dd"));
    }

    #[test]
    fn test_wrong_units() {
        let mut file = populated();
        replace_header(&mut file, "global_quantities/ip", |h| {
            h.attributes.insert(attrs::UNITS.into(), AttrValue::from("mA"));
        });
        let err = validate(&file, &schema(), TimeMode::Homogeneous).unwrap_err();
        assert!(err.to_string().contains("units"));
    }

    #[test]
    fn test_foreign_coordinate() {
        let mut file = populated();
        replace_header(&mut file, "global_quantities/ip", |h| {
            h.attributes.insert(attrs::COORDINATES.into(), AttrValue::from("time covariance"));
        });
        let err = validate(&file, &schema(), TimeMode::Homogeneous).unwrap_err();
        assert!(err.to_string().contains("coordinates"));
    }

    #[test]
    fn test_bad_ancillary_variable() {
        let mut file = populated();
        replace_header(&mut file, "global_quantities/ip", |h| {
            h.attributes
                .insert(attrs::ANCILLARY_VARIABLES.into(), AttrValue::from("time"));
        });
        let err = validate(&file, &schema(), TimeMode::Homogeneous).unwrap_err();
        assert!(err.to_string().contains("ancillary_variables"));
    }

    #[test]
    fn test_unknown_attribute() {
        let mut file = populated();
        replace_header(&mut file, "time", |h| {
            h.attributes.insert("colour".into(), AttrValue::from("blue"));
        });
        let err = validate(&file, &schema(), TimeMode::Homogeneous).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_documentation_mismatch_only_warns() {
        let mut file = populated();
        replace_header(&mut file, "time", |h| {
            h.attributes
                .insert(attrs::DOCUMENTATION.into(), AttrValue::from("something else"));
        });
        validate(&file, &schema(), TimeMode::Homogeneous).unwrap();
    }

    #[test]
    fn test_shape_table_without_sparse_owner() {
        let mut file = populated();
        replace_header(&mut file, "profiles_1d/ion", |h| {
            h.attributes.remove(attrs::SPARSE);
        });
        let err = validate(&file, &schema(), TimeMode::Homogeneous).unwrap_err();
        assert_eq!(err.variable(), Some("profiles_1d/ion:shape"));
    }

    #[test]
    fn test_sparse_without_shape_table() {
        let mut file = populated();
        file.remove_variable("profiles_1d/ion:shape").unwrap();
        let err = validate(&file, &schema(), TimeMode::Homogeneous).unwrap_err();
        assert_eq!(err.variable(), Some("profiles_1d/ion"));
    }
}
