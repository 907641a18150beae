//! Schema type definitions
//!
//! Supported data kinds:
//! - structure: named, schema-typed children
//! - struct_array: resizable sequence of structures (rank 1)
//! - STR: UTF-8 string, 0D or 1D
//! - INT: 32-bit signed integer, 0D to 3D
//! - FLT: 64-bit floating point, 0D to 6D
//! - CPX: 128-bit complex, 0D to 6D

use serde::{Deserialize, Serialize};

use super::version::DdVersion;

/// Data kind of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Structure,
    StructArray,
    Str,
    Int,
    Flt,
    Cpx,
}

impl DataKind {
    /// Parses a `data_type` token into a kind and a dimensionality.
    ///
    /// Accepts `structure`, `struct_array`, `TYP_ND` and the legacy
    /// `typ_type` / `typ_Nd_type` spellings.
    pub fn parse(token: &str) -> Option<(DataKind, usize)> {
        match token {
            "structure" => return Some((DataKind::Structure, 0)),
            "struct_array" => return Some((DataKind::StructArray, 1)),
            _ => {}
        }

        let upper = token.to_ascii_uppercase();
        let mut parts = upper.split('_');
        let kind = match parts.next()? {
            "STR" => DataKind::Str,
            "INT" => DataKind::Int,
            "FLT" => DataKind::Flt,
            "CPX" => DataKind::Cpx,
            _ => return None,
        };

        let rest: Vec<&str> = parts.collect();
        let ndim = match rest.as_slice() {
            ["TYPE"] => 0,
            [dims] | [dims, "TYPE"] => parse_dims(dims)?,
            _ => return None,
        };

        if ndim > kind.max_ndim() {
            return None;
        }
        Some((kind, ndim))
    }

    /// Highest dimensionality the dictionary allows for this kind
    pub fn max_ndim(&self) -> usize {
        match self {
            DataKind::Structure => 0,
            DataKind::StructArray => 1,
            DataKind::Str => 1,
            DataKind::Int => 3,
            DataKind::Flt | DataKind::Cpx => 6,
        }
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DataKind::Structure => "structure",
            DataKind::StructArray => "struct_array",
            DataKind::Str => "STR",
            DataKind::Int => "INT",
            DataKind::Flt => "FLT",
            DataKind::Cpx => "CPX",
        }
    }

    /// True for the kinds that hold values
    pub fn is_data(&self) -> bool {
        !matches!(self, DataKind::Structure | DataKind::StructArray)
    }
}

fn parse_dims(dims: &str) -> Option<usize> {
    let digits = dims.strip_suffix('D')?;
    if digits.len() != 1 {
        return None;
    }
    digits.parse().ok()
}

/// How a node behaves along the time axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Static,
    Constant,
    Dynamic,
}

/// Kind of a non-backward-compatible change recorded in the dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NbcChangeKind {
    /// Node was renamed or moved; data converts 1:1
    Renamed,
    /// Node changed type; data does not convert implicitly
    TypeChanged,
}

/// A non-backward-compatible change annotation on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NbcChange {
    /// Version in which the change took effect
    pub version: DdVersion,
    /// Full dataset-relative path before the change
    pub previous_name: String,
    #[serde(default = "default_change_kind")]
    pub change: NbcChangeKind,
}

fn default_change_kind() -> NbcChangeKind {
    NbcChangeKind::Renamed
}

/// One node of a schema document as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub units: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coordinates: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default, rename = "type")]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub sparse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_enum: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nbc: Vec<NbcChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDef>,
}

/// One dataset (toplevel) of a schema document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDef {
    pub name: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

/// A complete schema document for one Data Dictionary version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryDef {
    pub version: DdVersion,
    #[serde(default)]
    pub datasets: Vec<DatasetDef>,
}

/// Immutable per-path schema record.
///
/// Descriptors are built once per dictionary version and shared by every
/// tree node typed by them.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Slash-separated dataset-relative path; empty for the dataset root
    pub path: String,
    pub name: String,
    pub kind: DataKind,
    /// 0 for scalars, 1 for struct arrays
    pub ndim: usize,
    pub units: String,
    pub coordinates: Vec<String>,
    pub documentation: String,
    pub lifecycle: Lifecycle,
    /// Struct arrays only: per-instance size may vary
    pub is_sparse: bool,
    pub identifier_enum: Option<String>,
    pub nbc: Vec<NbcChange>,
    /// Child names in schema order
    pub children: Vec<String>,
}

impl Descriptor {
    /// Returns the parent path, `None` for the dataset root
    pub fn parent_path(&self) -> Option<&str> {
        if self.path.is_empty() {
            return None;
        }
        Some(match self.path.rfind('/') {
            Some(pos) => &self.path[..pos],
            None => "",
        })
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn is_dynamic(&self) -> bool {
        self.lifecycle == Lifecycle::Dynamic
    }

    /// True if coordinate `axis` refers to a time base
    pub fn coordinate_is_time(&self, axis: usize) -> bool {
        self.coordinates
            .get(axis)
            .map(|c| is_time_coordinate(c))
            .unwrap_or(false)
    }

    /// True if this struct array is indexed by time
    pub fn is_time_dependent(&self) -> bool {
        self.kind == DataKind::StructArray && self.coordinate_is_time(0)
    }

    /// True for the dataset-wide time base `time`
    pub fn is_timebase(&self) -> bool {
        self.path == "time" && self.kind == DataKind::Flt && self.ndim == 1
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c == name)
    }
}

/// True if a coordinate reference names a time base
pub fn is_time_coordinate(coordinate: &str) -> bool {
    coordinate == "time" || coordinate.ends_with("/time")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structure_tokens() {
        assert_eq!(DataKind::parse("structure"), Some((DataKind::Structure, 0)));
        assert_eq!(DataKind::parse("struct_array"), Some((DataKind::StructArray, 1)));
    }

    #[test]
    fn test_parse_regular_tokens() {
        assert_eq!(DataKind::parse("STR_0D"), Some((DataKind::Str, 0)));
        assert_eq!(DataKind::parse("STR_1D"), Some((DataKind::Str, 1)));
        assert_eq!(DataKind::parse("FLT_6D"), Some((DataKind::Flt, 6)));
        assert_eq!(DataKind::parse("CPX_2D"), Some((DataKind::Cpx, 2)));
        assert_eq!(DataKind::parse("INT_3D"), Some((DataKind::Int, 3)));
    }

    #[test]
    fn test_parse_legacy_tokens() {
        assert_eq!(DataKind::parse("flt_type"), Some((DataKind::Flt, 0)));
        assert_eq!(DataKind::parse("flt_1d_type"), Some((DataKind::Flt, 1)));
        assert_eq!(DataKind::parse("str_type"), Some((DataKind::Str, 0)));
        assert_eq!(DataKind::parse("int_1d_type"), Some((DataKind::Int, 1)));
    }

    #[test]
    fn test_parse_rejects_unknown_tokens() {
        assert_eq!(DataKind::parse("BOOL_0D"), None);
        assert_eq!(DataKind::parse("FLT"), None);
        assert_eq!(DataKind::parse("FLT_XD"), None);
        assert_eq!(DataKind::parse("INT_4D"), None);
        assert_eq!(DataKind::parse("STR_2D"), None);
        assert_eq!(DataKind::parse("FLT_10D"), None);
    }

    #[test]
    fn test_time_coordinates() {
        assert!(is_time_coordinate("time"));
        assert!(is_time_coordinate("profiles_1d/time"));
        assert!(!is_time_coordinate("1...N"));
        assert!(!is_time_coordinate("grid/rho_tor_norm"));
    }

    #[test]
    fn test_node_def_defaults() {
        let def: NodeDef = serde_json::from_str(r#"{"name": "a", "data_type": "INT_0D"}"#).unwrap();
        assert_eq!(def.lifecycle, Lifecycle::Static);
        assert!(def.children.is_empty());
        assert!(!def.sparse);
    }

    #[test]
    fn test_nbc_change_default_kind() {
        let change: NbcChange =
            serde_json::from_str(r#"{"version": "3.2.0", "previous_name": "old/name"}"#).unwrap();
        assert_eq!(change.change, NbcChangeKind::Renamed);
        assert_eq!(change.version, DdVersion::new(3, 2, 0));
    }
}
