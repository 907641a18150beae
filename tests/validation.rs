//! Validation Tests
//!
//! A file whose variables disagree with the dictionary fails to decode with
//! an error naming the variable, unless validation is switched off.

use std::sync::Arc;

use ddtree::codec::{self, CodecError, Decoder};
use ddtree::columnar::{attrs, AttrValue, ColumnarFile, ColumnarReader, ColumnarWriter};
use ddtree::schema::{DataDictionary, DatasetSchema};
use ddtree::tree::{TimeMode, Toplevel};
use ddtree::CodecConfig;
use tempfile::TempDir;

fn schema() -> Arc<DatasetSchema> {
    DataDictionary::from_json_str(include_str!("fixtures/dd_1.0.0.json"), "dd_1.0.0.json")
        .unwrap()
        .dataset("core_profiles")
        .unwrap()
}

fn homogeneous_file() -> ColumnarFile {
    let ids = Toplevel::new(schema());
    ids.set_time_mode(TimeMode::Homogeneous).unwrap();
    ids.set("time", vec![0.0f64, 1.0]).unwrap();
    ids.set("global_quantities/ip", vec![1.0f64, 2.0]).unwrap();
    codec::encode(&ids).unwrap()
}

/// `global_quantities/ip` moved off the shared time dimension onto one of
/// the same size
fn with_foreign_dimension() -> ColumnarFile {
    let mut file = homogeneous_file();
    file.add_dimension("global_quantities/ip:0", 2).unwrap();
    file.variable_mut("global_quantities/ip").unwrap().header.dimensions =
        vec!["global_quantities/ip:0".to_string()];
    file
}

#[test]
fn test_dimension_mismatch_names_variable() {
    let file = with_foreign_dimension();
    let decoder = Decoder::new(&file, schema(), CodecConfig::default()).unwrap();
    match decoder.decode(schema(), None) {
        Err(CodecError::InvalidEncoding { variable, message }) => {
            assert_eq!(variable, "global_quantities/ip");
            assert!(message.contains("dimensions"), "{}", message);
        }
        other => panic!("expected an encoding error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_disabled_validation_decodes_anyway() {
    let file = with_foreign_dimension();
    let config = CodecConfig::default().without_validation();
    let ids = Decoder::new(&file, schema(), config)
        .unwrap()
        .decode(schema(), None)
        .unwrap();
    let ip = ids.get("global_quantities/ip").unwrap().into_leaf().unwrap();
    assert_eq!(ip.float_array().unwrap().into_raw_vec(), vec![1.0, 2.0]);
}

#[test]
fn test_lazy_decode_validates_up_front() {
    let file = with_foreign_dimension();
    let err = Decoder::new(file, schema(), CodecConfig::lazy())
        .unwrap()
        .decode_lazy(schema(), None)
        .err()
        .unwrap();
    assert_eq!(err.variable(), Some("global_quantities/ip"));
}

#[test]
fn test_invalid_file_on_disk() {
    let mut file = homogeneous_file();
    file.variable_mut("global_quantities/ip")
        .unwrap()
        .header
        .attributes
        .insert(attrs::UNITS.to_string(), AttrValue::from("kA"));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad_units.ddtc");
    ColumnarWriter::create(&path).unwrap().write(&file).unwrap();

    let reader = ColumnarReader::open(&path).unwrap();
    let decoder = Decoder::new(reader, schema(), CodecConfig::default()).unwrap();
    let err = decoder.validate().unwrap_err();
    assert_eq!(err.variable(), Some("global_quantities/ip"));
    assert!(err.to_string().contains("units"));
}

#[test]
fn test_encoded_files_validate_in_every_time_mode() {
    for mode in [TimeMode::Heterogeneous, TimeMode::Homogeneous, TimeMode::Independent] {
        let ids = Toplevel::new(schema());
        ids.set_time_mode(mode).unwrap();
        ids.set("time", vec![0.0f64, 1.0]).unwrap();
        ids.set("ids_properties/comment", "modes").unwrap();
        let profiles = ids.root().struct_array("profiles_1d").unwrap();
        profiles.resize(2).unwrap();
        profiles.get(1).unwrap().struct_array("ion").unwrap().resize(2).unwrap();

        let file = codec::encode(&ids).unwrap();
        codec::validate(&file, &schema(), mode).unwrap();
    }
}
