//! Tree Invariant Tests
//!
//! - `has_value` is a recursive OR over populated leaves
//! - resizing to the same size keeps element identity and values
//! - shrinking then regrowing yields fresh elements and detaches old ones

use ddtree::schema::DataDictionary;
use ddtree::tree::{Structure, Toplevel, TreeError};

fn core_profiles() -> Toplevel {
    let dictionary =
        DataDictionary::from_json_str(include_str!("fixtures/dd_1.0.0.json"), "dd_1.0.0.json")
            .unwrap();
    Toplevel::new(dictionary.dataset("core_profiles").unwrap())
}

#[test]
fn test_has_value_tracks_populated_leaves() {
    let ids = core_profiles();
    let profiles = ids.root().struct_array("profiles_1d").unwrap();
    profiles.resize(1).unwrap();
    let profile = profiles.get(0).unwrap();

    profile.leaf("zeff_flag").unwrap().set_value(5).unwrap();
    assert!(profile.has_value().unwrap());
    assert!(!profile.structure("grid").unwrap().has_value().unwrap());
    assert!(ids.has_value().unwrap());
}

#[test]
fn test_resize_to_same_size_is_idempotent() {
    let ids = core_profiles();
    let profiles = ids.root().struct_array("profiles_1d").unwrap();
    profiles.resize(3).unwrap();
    for (i, p) in profiles.elements().unwrap().iter().enumerate() {
        p.leaf("time").unwrap().set_value(i as f64).unwrap();
    }
    let before = profiles.elements().unwrap();

    profiles.resize(3).unwrap();
    profiles.resize(3).unwrap();
    let after = profiles.elements().unwrap();
    for (i, (a, b)) in before.iter().zip(&after).enumerate() {
        assert!(Structure::ptr_eq(a, b));
        assert_eq!(b.leaf("time").unwrap().as_f64().unwrap(), i as f64);
    }
}

#[test]
fn test_regrowth_is_fresh() {
    let ids = core_profiles();
    let profiles = ids.root().struct_array("profiles_1d").unwrap();
    profiles.resize(3).unwrap();
    let old = profiles.get(2).unwrap();
    old.leaf("time").unwrap().set_value(9.0).unwrap();

    profiles.resize(1).unwrap();
    profiles.resize(3).unwrap();
    let fresh = profiles.get(2).unwrap();
    assert!(!Structure::ptr_eq(&old, &fresh));
    assert!(!fresh.has_value().unwrap());
    assert!(matches!(old.leaf("time"), Err(TreeError::Detached(_))));
}

#[test]
fn test_type_mismatch_is_surfaced() {
    let ids = core_profiles();
    let err = ids.set("ids_properties/homogeneous_time", 1.5).unwrap_err();
    assert!(matches!(err, TreeError::TypeMismatch { .. }));
    let err = ids.set("global_quantities/ip", "text").unwrap_err();
    assert!(matches!(err, TreeError::TypeMismatch { .. }));
}

#[test]
fn test_unknown_field_is_surfaced() {
    let ids = core_profiles();
    match ids.get("global_quantities/does_not_exist") {
        Err(TreeError::UnknownField { path, name }) => {
            assert_eq!(path, "global_quantities");
            assert_eq!(name, "does_not_exist");
        }
        other => panic!("unexpected {:?}", other),
    }
}
