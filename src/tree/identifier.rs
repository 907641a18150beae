//! Identifier structures
//!
//! An identifier structure has `name`, `index` and `description` leaves
//! (and optionally `alias`) whose values come from a registry enumeration
//! named by its descriptor's `identifier_enum`.

use crate::identifiers::{IdentifierEntry, IdentifierEnum};
use crate::observability::{log_event, Event};

use super::errors::{TreeError, TreeResult};
use super::structure::Structure;
use super::value::Value;

/// How to pick an identifier entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRef<'a> {
    Index(i32),
    /// Name or alias
    Name(&'a str),
}

impl From<i32> for IdentifierRef<'_> {
    fn from(index: i32) -> Self {
        IdentifierRef::Index(index)
    }
}

impl<'a> From<&'a str> for IdentifierRef<'a> {
    fn from(name: &'a str) -> Self {
        IdentifierRef::Name(name)
    }
}

impl Structure {
    fn identifier_enum(&self) -> TreeResult<&IdentifierEnum> {
        let header = &self.0.header;
        let enum_name = header.descriptor.identifier_enum.as_deref().ok_or_else(|| {
            TreeError::Identifier {
                path: self.path(),
                reason: "not an identifier structure".to_string(),
            }
        })?;
        let registry = header.ctx.identifiers.as_ref().ok_or_else(|| TreeError::Identifier {
            path: self.path(),
            reason: "no identifier registry attached".to_string(),
        })?;
        registry.lookup(enum_name).ok_or_else(|| TreeError::Identifier {
            path: self.path(),
            reason: format!("unknown identifier enum '{}'", enum_name),
        })
    }

    /// Fills `name`, `index` and `description` from a registry entry.
    ///
    /// Names resolve through aliases to the canonical entry name.
    pub fn assign_identifier<'a>(&self, which: impl Into<IdentifierRef<'a>>) -> TreeResult<()> {
        let which = which.into();
        let identifier_enum = self.identifier_enum()?;
        let entry = match which {
            IdentifierRef::Index(index) => identifier_enum.by_index(index),
            IdentifierRef::Name(name) => identifier_enum.by_name(name),
        }
        .cloned()
        .ok_or_else(|| {
            let key = match which {
                IdentifierRef::Index(index) => index.to_string(),
                IdentifierRef::Name(name) => format!("'{}'", name),
            };
            TreeError::type_mismatch(
                self.path(),
                identifier_enum.name.clone(),
                format!("{} is not a valid identifier", key),
            )
        })?;

        self.leaf("name")?.set_value(entry.name.as_str())?;
        self.leaf("index")?.set_value(entry.index)?;
        self.leaf("description")?.set_value(entry.description.as_str())?;
        Ok(())
    }

    /// The registry entry matching the stored index, if any
    pub fn identifier_entry(&self) -> TreeResult<Option<IdentifierEntry>> {
        let identifier_enum = self.identifier_enum()?;
        let index = self.leaf("index")?.as_i32()?;
        Ok(identifier_enum.by_index(index).cloned())
    }

    /// Fuzzy equality against a registry entry.
    ///
    /// - `index` must equal the entry's index
    /// - `name` may be empty, the entry name or one of its aliases; a
    ///   populated `alias` leaf may stand in for it
    /// - `description` may be empty or blank; any other mismatch is logged
    ///   and otherwise ignored
    pub fn identifier_matches(&self, entry: &IdentifierEntry) -> TreeResult<bool> {
        if self.leaf("index")?.value()? != Value::Int(entry.index) {
            return Ok(false);
        }

        let name = self.leaf("name")?.as_str()?;
        let name_ok = name.is_empty() || entry.answers_to(&name) || self.alias_matches(entry)?;
        if !name_ok {
            return Ok(false);
        }

        let description = self.leaf("description")?.as_str()?;
        if !description.trim().is_empty() && description != entry.description {
            let path = self.path();
            let index = entry.index.to_string();
            log_event(
                Event::IdentifierDescriptionMismatch,
                &[
                    ("path", path.as_str()),
                    ("index", index.as_str()),
                    ("expected", entry.description.as_str()),
                    ("actual", description.as_str()),
                ],
            );
        }
        Ok(true)
    }

    fn alias_matches(&self, entry: &IdentifierEntry) -> TreeResult<bool> {
        if !self.descriptor().has_child("alias") {
            return Ok(false);
        }
        let alias = self.leaf("alias")?.as_str()?;
        Ok(!alias.is_empty() && entry.answers_to(&alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::identifiers::{IdentifierRegistry, StaticIdentifierRegistry};
    use crate::schema::fixtures;
    use crate::tree::Toplevel;

    fn registry() -> Arc<StaticIdentifierRegistry> {
        Arc::new(StaticIdentifierRegistry::from_json_str(fixtures::IDENTIFIERS).unwrap())
    }

    fn grid_type() -> (Toplevel, Structure) {
        let ids = Toplevel::new(fixtures::dictionary_v1().dataset("core_profiles").unwrap())
            .with_identifiers(registry());
        let grid_type = ids.root().structure("grid_type").unwrap();
        (ids, grid_type)
    }

    fn entry(index: i32) -> IdentifierEntry {
        registry()
            .lookup("grid_type_identifier")
            .unwrap()
            .by_index(index)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_assign_by_index() {
        let (_ids, grid_type) = grid_type();
        grid_type.assign_identifier(3).unwrap();
        assert_eq!(grid_type.leaf("name").unwrap().as_str().unwrap(), "psi");
        assert_eq!(grid_type.leaf("index").unwrap().as_i32().unwrap(), 3);
        assert_eq!(
            grid_type.leaf("description").unwrap().as_str().unwrap(),
            "Poloidal magnetic flux"
        );
    }

    #[test]
    fn test_assign_by_alias_normalizes_name() {
        let (_ids, grid_type) = grid_type();
        grid_type.assign_identifier("rho_toroidal").unwrap();
        assert_eq!(grid_type.leaf("name").unwrap().as_str().unwrap(), "rho_tor");
        assert_eq!(grid_type.identifier_entry().unwrap(), Some(entry(2)));
    }

    #[test]
    fn test_assign_unknown() {
        let (_ids, grid_type) = grid_type();
        assert!(matches!(
            grid_type.assign_identifier(99),
            Err(TreeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            grid_type.assign_identifier("nope"),
            Err(TreeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_not_an_identifier_structure() {
        let (ids, _) = grid_type();
        let gq = ids.root().structure("global_quantities").unwrap();
        assert!(matches!(gq.assign_identifier(1), Err(TreeError::Identifier { .. })));
    }

    #[test]
    fn test_no_registry() {
        let ids = Toplevel::new(fixtures::dictionary_v1().dataset("core_profiles").unwrap());
        let grid_type = ids.root().structure("grid_type").unwrap();
        assert!(matches!(grid_type.assign_identifier(1), Err(TreeError::Identifier { .. })));
    }

    #[test]
    fn test_fuzzy_equality_exact() {
        let (_ids, grid_type) = grid_type();
        grid_type.assign_identifier(1).unwrap();
        assert!(grid_type.identifier_matches(&entry(1)).unwrap());
        assert!(!grid_type.identifier_matches(&entry(2)).unwrap());
    }

    #[test]
    fn test_fuzzy_equality_empty_description() {
        let (_ids, grid_type) = grid_type();
        grid_type.assign_identifier(1).unwrap();
        grid_type.leaf("description").unwrap().clear().unwrap();
        assert!(grid_type.identifier_matches(&entry(1)).unwrap());

        grid_type.leaf("description").unwrap().set_value("   ").unwrap();
        assert!(grid_type.identifier_matches(&entry(1)).unwrap());
    }

    #[test]
    fn test_fuzzy_equality_mismatched_description_still_matches() {
        let (_ids, grid_type) = grid_type();
        grid_type.assign_identifier(1).unwrap();
        grid_type.leaf("description").unwrap().set_value("something else").unwrap();
        assert!(grid_type.identifier_matches(&entry(1)).unwrap());
    }

    #[test]
    fn test_fuzzy_equality_name_rules() {
        let (_ids, grid_type) = grid_type();
        grid_type.assign_identifier(2).unwrap();

        grid_type.leaf("name").unwrap().clear().unwrap();
        assert!(grid_type.identifier_matches(&entry(2)).unwrap());

        grid_type.leaf("name").unwrap().set_value("rho_toroidal").unwrap();
        assert!(grid_type.identifier_matches(&entry(2)).unwrap());

        grid_type.leaf("name").unwrap().set_value("psi").unwrap();
        assert!(!grid_type.identifier_matches(&entry(2)).unwrap());

        grid_type.leaf("alias").unwrap().set_value("rho_toroidal").unwrap();
        assert!(grid_type.identifier_matches(&entry(2)).unwrap());
    }

    #[test]
    fn test_index_must_match() {
        let (_ids, grid_type) = grid_type();
        grid_type.assign_identifier(1).unwrap();
        grid_type.leaf("index").unwrap().set_value(3).unwrap();
        assert!(!grid_type.identifier_matches(&entry(1)).unwrap());
    }
}
