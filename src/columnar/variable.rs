//! Variables: typed, dimensioned value buffers with attributes

use std::collections::BTreeMap;
use std::ops::Range;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::schema::DataKind;
use crate::tree::{EMPTY_COMPLEX, EMPTY_FLOAT, EMPTY_INT};

/// Attribute names understood by the codec
pub mod attrs {
    pub const UNITS: &str = "units";
    pub const COORDINATES: &str = "coordinates";
    pub const SPARSE: &str = "sparse";
    pub const ANCILLARY_VARIABLES: &str = "ancillary_variables";
    pub const DOCUMENTATION: &str = "documentation";
    pub const FILL_VALUE: &str = "_FillValue";
}

/// Element type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Str,
    I32,
    F64,
    C128,
}

impl DType {
    /// Element type used to store leaves of `kind`
    pub fn for_kind(kind: DataKind) -> Option<DType> {
        match kind {
            DataKind::Str => Some(DType::Str),
            DataKind::Int => Some(DType::I32),
            DataKind::Flt => Some(DType::F64),
            DataKind::Cpx => Some(DType::C128),
            DataKind::Structure | DataKind::StructArray => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Str => "str",
            DType::I32 => "i32",
            DType::F64 => "f64",
            DType::C128 => "c128",
        }
    }

    /// Bytes per element on disk; `None` for variable-width strings
    pub fn width(&self) -> Option<usize> {
        match self {
            DType::Str => None,
            DType::I32 => Some(4),
            DType::F64 => Some(8),
            DType::C128 => Some(16),
        }
    }

    /// The fill value written for unset elements
    pub fn fill_value(&self) -> AttrValue {
        match self {
            DType::Str => AttrValue::Str(String::new()),
            DType::I32 => AttrValue::Int(EMPTY_INT),
            DType::F64 => AttrValue::Float(EMPTY_FLOAT),
            DType::C128 => AttrValue::Complex([EMPTY_COMPLEX.re, EMPTY_COMPLEX.im]),
        }
    }
}

/// An attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i32),
    Float(f64),
    Complex([f64; 2]),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

/// Row-major element buffer of one variable
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    Str(Vec<String>),
    Int(Vec<i32>),
    Float(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl VariableData {
    /// `len` elements of the fill value of `dtype`
    pub fn filled(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::Str => VariableData::Str(vec![String::new(); len]),
            DType::I32 => VariableData::Int(vec![EMPTY_INT; len]),
            DType::F64 => VariableData::Float(vec![EMPTY_FLOAT; len]),
            DType::C128 => VariableData::Complex(vec![EMPTY_COMPLEX; len]),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            VariableData::Str(_) => DType::Str,
            VariableData::Int(_) => DType::I32,
            VariableData::Float(_) => DType::F64,
            VariableData::Complex(_) => DType::C128,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VariableData::Str(v) => v.len(),
            VariableData::Int(v) => v.len(),
            VariableData::Float(v) => v.len(),
            VariableData::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the elements in `range`; `None` when it runs past the end
    pub fn slice(&self, range: Range<usize>) -> Option<VariableData> {
        Some(match self {
            VariableData::Str(v) => VariableData::Str(v.get(range)?.to_vec()),
            VariableData::Int(v) => VariableData::Int(v.get(range)?.to_vec()),
            VariableData::Float(v) => VariableData::Float(v.get(range)?.to_vec()),
            VariableData::Complex(v) => VariableData::Complex(v.get(range)?.to_vec()),
        })
    }
}

/// Name, type, dimensions and attributes of a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableHeader {
    pub name: String,
    pub dtype: DType,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl VariableHeader {
    pub fn new(name: impl Into<String>, dtype: DType, dimensions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dtype,
            dimensions,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(AttrValue::as_str)
    }

    /// Carries the `sparse` attribute
    pub fn is_sparse(&self) -> bool {
        self.attributes.contains_key(attrs::SPARSE)
    }

    /// Declared fill value, if any
    pub fn fill_value(&self) -> Option<&AttrValue> {
        self.attr(attrs::FILL_VALUE)
    }
}

/// Name of the shape table belonging to `variable`
pub fn shape_table_name(variable: &str) -> String {
    format!("{}:shape", variable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_values_survive_json() {
        let header = VariableHeader::new("x", DType::F64, vec!["x:0".into()])
            .with_attr(attrs::UNITS, "eV")
            .with_attr(attrs::FILL_VALUE, EMPTY_FLOAT)
            .with_attr("count", 3);
        let json = serde_json::to_string(&header).unwrap();
        let back: VariableHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back, header);
        assert_eq!(back.attr_str(attrs::UNITS), Some("eV"));
    }

    #[test]
    fn test_complex_fill_value() {
        let fill = DType::C128.fill_value();
        let json = serde_json::to_string(&fill).unwrap();
        let back: AttrValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fill);
    }

    #[test]
    fn test_filled() {
        let data = VariableData::filled(DType::I32, 3);
        assert_eq!(data, VariableData::Int(vec![EMPTY_INT; 3]));
        assert_eq!(data.dtype(), DType::I32);
        assert_eq!(DType::for_kind(DataKind::StructArray), None);
    }

    #[test]
    fn test_sparse_flag() {
        let header = VariableHeader::new("a", DType::Str, vec![]);
        assert!(!header.is_sparse());
        assert!(header.with_attr(attrs::SPARSE, "ragged").is_sparse());
        assert_eq!(shape_table_name("a/b"), "a/b:shape");
    }
}
