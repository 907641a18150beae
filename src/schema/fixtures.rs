//! Shared dictionaries for unit tests

use std::sync::Arc;

use super::dictionary::DataDictionary;

pub const DD_1_0_0: &str = include_str!("../../tests/fixtures/dd_1.0.0.json");
pub const DD_2_0_0: &str = include_str!("../../tests/fixtures/dd_2.0.0.json");
pub const IDENTIFIERS: &str = include_str!("../../tests/fixtures/identifiers.json");

pub fn dictionary_v1() -> Arc<DataDictionary> {
    Arc::new(DataDictionary::from_json_str(DD_1_0_0, "dd_1.0.0.json").unwrap())
}

pub fn dictionary_v2() -> Arc<DataDictionary> {
    Arc::new(DataDictionary::from_json_str(DD_2_0_0, "dd_2.0.0.json").unwrap())
}
