//! Version path maps
//!
//! A [`VersionPathMap`] answers, for every path of one dictionary version,
//! where that path lives in another version. It is built eagerly over the
//! whole source path set, so lookups never fail and never log.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::annotation::{Annotation, AnnotationSet};
use super::errors::{MappingError, MappingResult};
use crate::observability::{log_event, Event};
use crate::schema::{DataKind, DatasetSchema, DdVersion, NbcChangeKind};

/// Fate of one source path in the target version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Same data, possibly under another path
    Mapped(String),
    /// No equivalent in the target version
    Dropped,
    /// Equivalent exists but its type changed; not converted
    TypeChanged,
}

impl Resolution {
    pub fn target(&self) -> Option<&str> {
        match self {
            Resolution::Mapped(path) => Some(path),
            _ => None,
        }
    }
}

/// Immutable path mapping between two versions of one dataset
#[derive(Debug, Clone)]
pub struct VersionPathMap {
    dataset: String,
    from: DdVersion,
    to: DdVersion,
    entries: HashMap<String, Resolution>,
}

impl VersionPathMap {
    /// Maps every path of `schema` onto itself
    pub fn identity(schema: &DatasetSchema) -> Self {
        let entries = schema
            .paths()
            .iter()
            .map(|p| (p.clone(), Resolution::Mapped(p.clone())))
            .collect();
        Self {
            dataset: schema.name().to_string(),
            from: schema.version(),
            to: schema.version(),
            entries,
        }
    }

    /// Builds the map from `from` to `to`, using the change history recorded
    /// in whichever of the two is newer
    pub fn between(from: &DatasetSchema, to: &DatasetSchema) -> MappingResult<Self> {
        let newer = if from.version() >= to.version() { from } else { to };
        let annotations = AnnotationSet::from_schema(newer)?;
        Self::build(from, to, &annotations)
    }

    /// Builds the map from `from` to `to` under `annotations`.
    ///
    /// Going forward, annotations with `from < version <= to` are applied
    /// oldest first; going backward, those with `to < version <= from` are
    /// undone newest first. Within one version the longest matching path
    /// prefix wins, so a rename of a structure carries its whole subtree
    /// unless a child has its own annotation.
    pub fn build(
        from: &DatasetSchema,
        to: &DatasetSchema,
        annotations: &AnnotationSet,
    ) -> MappingResult<Self> {
        if from.name() != to.name() {
            return Err(MappingError::DatasetMismatch(
                from.name().to_string(),
                to.name().to_string(),
            ));
        }

        let forward = from.version() <= to.version();
        let mut steps = if forward {
            annotations.steps(from.version(), to.version())
        } else {
            annotations.steps(to.version(), from.version())
        };
        if !forward {
            steps.reverse();
        }

        let mut entries = HashMap::with_capacity(from.paths().len());
        let (mut mapped, mut dropped, mut type_changed) = (0usize, 0usize, 0usize);
        for path in from.paths() {
            let resolution = resolve_one(path, from, to, &steps, forward);
            match resolution {
                Resolution::Mapped(_) => mapped += 1,
                Resolution::Dropped => dropped += 1,
                Resolution::TypeChanged => type_changed += 1,
            }
            entries.insert(path.clone(), resolution);
        }

        let (from_v, to_v) = (from.version().to_string(), to.version().to_string());
        let (mapped, dropped, type_changed) =
            (mapped.to_string(), dropped.to_string(), type_changed.to_string());
        log_event(
            Event::PathMapBuilt,
            &[
                ("dataset", from.name()),
                ("from", from_v.as_str()),
                ("to", to_v.as_str()),
                ("mapped", mapped.as_str()),
                ("dropped", dropped.as_str()),
                ("type_changed", type_changed.as_str()),
            ],
        );

        Ok(Self {
            dataset: from.name().to_string(),
            from: from.version(),
            to: to.version(),
            entries,
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn from_version(&self) -> DdVersion {
        self.from
    }

    pub fn to_version(&self) -> DdVersion {
        self.to
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Resolves a source schema path; paths the source version does not
    /// define are `Dropped`
    pub fn resolve(&self, path: &str) -> Resolution {
        self.entries.get(path).cloned().unwrap_or(Resolution::Dropped)
    }

    /// Source paths with their resolution, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resolution)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Target path to source path, over the mapped entries
    pub fn inverse(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(source, r)| r.target().map(|t| (t.to_string(), source.clone())))
            .collect()
    }
}

fn resolve_one(
    path: &str,
    from: &DatasetSchema,
    to: &DatasetSchema,
    steps: &[Vec<&Annotation>],
    forward: bool,
) -> Resolution {
    let mut current = path.to_string();
    for step in steps {
        let Some((annotation, suffix)) = best_match(&current, step, forward) else {
            continue;
        };
        if annotation.kind == NbcChangeKind::TypeChanged {
            if suffix.is_empty() {
                return Resolution::TypeChanged;
            }
            continue;
        }
        let replacement = if forward {
            &annotation.new_path
        } else {
            &annotation.old_path
        };
        current = format!("{}{}", replacement, suffix);
    }

    let (Some(source), Some(target)) = (from.get(path), to.get(&current)) else {
        return Resolution::Dropped;
    };
    let compatible = source.kind == target.kind
        && (source.ndim == target.ndim || matches!(source.kind, DataKind::Structure | DataKind::StructArray));
    if compatible {
        Resolution::Mapped(current)
    } else {
        Resolution::TypeChanged
    }
}

/// The annotation whose path is the longest prefix of `path`, with the
/// remaining suffix (empty or starting with `/`)
fn best_match<'a, 'p>(
    path: &'p str,
    step: &[&'a Annotation],
    forward: bool,
) -> Option<(&'a Annotation, &'p str)> {
    step.iter()
        .filter_map(|a| {
            let key = if forward { &a.old_path } else { &a.new_path };
            let suffix = path.strip_prefix(key.as_str())?;
            (suffix.is_empty() || suffix.starts_with('/')).then_some((*a, suffix))
        })
        .max_by_key(|(a, _)| if forward { a.old_path.len() } else { a.new_path.len() })
}

/// Shared handle on a built map
pub type SharedPathMap = Arc<VersionPathMap>;
