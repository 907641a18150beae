//! Identifier registry lookup service

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for registry construction
pub type IdentifierResult<T> = Result<T, IdentifierError>;

/// Identifier registry errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Malformed identifier registry '{0}': {1}")]
    Malformed(String, String),

    #[error("Identifier enum '{0}' defines index {1} twice")]
    DuplicateIndex(String, i32),

    #[error("Identifier enum '{0}' defines name or alias '{1}' twice")]
    DuplicateName(String, String),

    #[error("Identifier enum '{0}' is defined twice")]
    DuplicateEnum(String),
}

/// One valid value of an identifier enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierEntry {
    pub index: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl IdentifierEntry {
    /// True if `name` is this entry's name or one of its aliases
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// A named set of identifier entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierEnum {
    pub name: String,
    pub entries: Vec<IdentifierEntry>,
}

impl IdentifierEnum {
    pub fn by_index(&self, index: i32) -> Option<&IdentifierEntry> {
        self.entries.iter().find(|e| e.index == index)
    }

    /// Looks up an entry by name or alias
    pub fn by_name(&self, name: &str) -> Option<&IdentifierEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .or_else(|| self.entries.iter().find(|e| e.answers_to(name)))
    }

    fn check(&self) -> IdentifierResult<()> {
        let mut indices = HashSet::new();
        let mut names = HashSet::new();
        for entry in &self.entries {
            if !indices.insert(entry.index) {
                return Err(IdentifierError::DuplicateIndex(self.name.clone(), entry.index));
            }
            for name in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
                if !names.insert(name.as_str()) {
                    return Err(IdentifierError::DuplicateName(self.name.clone(), name.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Lookup service for identifier enumerations
pub trait IdentifierRegistry: Send + Sync {
    /// Returns the enumeration called `name`
    fn lookup(&self, name: &str) -> Option<&IdentifierEnum>;
}

/// Registry backed by an in-memory table
#[derive(Debug, Default, Clone)]
pub struct StaticIdentifierRegistry {
    enums: HashMap<String, IdentifierEnum>,
}

impl StaticIdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an enumeration; names and indices must be unique within it
    pub fn insert(&mut self, identifier_enum: IdentifierEnum) -> IdentifierResult<()> {
        identifier_enum.check()?;
        if self.enums.contains_key(&identifier_enum.name) {
            return Err(IdentifierError::DuplicateEnum(identifier_enum.name));
        }
        self.enums.insert(identifier_enum.name.clone(), identifier_enum);
        Ok(())
    }

    /// Parses a JSON array of enumerations
    pub fn from_json_str(json: &str) -> IdentifierResult<Self> {
        let enums: Vec<IdentifierEnum> = serde_json::from_str(json)
            .map_err(|e| IdentifierError::Malformed("<inline>".into(), e.to_string()))?;
        let mut registry = Self::new();
        for identifier_enum in enums {
            registry.insert(identifier_enum)?;
        }
        Ok(registry)
    }

    pub fn from_file(path: &Path) -> IdentifierResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IdentifierError::Malformed(path.display().to_string(), e.to_string())
        })?;
        Self::from_json_str(&content).map_err(|e| match e {
            IdentifierError::Malformed(_, reason) => {
                IdentifierError::Malformed(path.display().to_string(), reason)
            }
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }
}

impl IdentifierRegistry for StaticIdentifierRegistry {
    fn lookup(&self, name: &str) -> Option<&IdentifierEnum> {
        self.enums.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures;

    fn registry() -> StaticIdentifierRegistry {
        StaticIdentifierRegistry::from_json_str(fixtures::IDENTIFIERS).unwrap()
    }

    #[test]
    fn test_lookup_by_index_name_alias() {
        let registry = registry();
        let grid = registry.lookup("grid_type_identifier").unwrap();
        assert_eq!(grid.by_index(3).unwrap().name, "psi");
        assert_eq!(grid.by_name("rho_tor").unwrap().index, 2);
        assert_eq!(grid.by_name("rho_toroidal").unwrap().index, 2);
        assert!(grid.by_name("unknown").is_none());
        assert!(grid.by_index(42).is_none());
    }

    #[test]
    fn test_unknown_enum() {
        assert!(registry().lookup("nope").is_none());
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let json = r#"[{"name": "e", "entries": [
            {"index": 1, "name": "a"}, {"index": 1, "name": "b"}
        ]}]"#;
        let err = StaticIdentifierRegistry::from_json_str(json).unwrap_err();
        assert_eq!(err, IdentifierError::DuplicateIndex("e".into(), 1));
    }

    #[test]
    fn test_alias_clash_rejected() {
        let json = r#"[{"name": "e", "entries": [
            {"index": 1, "name": "a"}, {"index": 2, "name": "b", "aliases": ["a"]}
        ]}]"#;
        let err = StaticIdentifierRegistry::from_json_str(json).unwrap_err();
        assert!(matches!(err, IdentifierError::DuplicateName(_, _)));
    }

    #[test]
    fn test_malformed_json() {
        let err = StaticIdentifierRegistry::from_json_str("[{").unwrap_err();
        assert!(matches!(err, IdentifierError::Malformed(_, _)));
    }
}
