//! Rename and type-change annotations

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::{MappingError, MappingResult};
use crate::schema::{DatasetSchema, DdVersion, NbcChangeKind};

/// One non-backward-compatible change: `old_path` became `new_path` in
/// `version`. A type change keeps the path and sets `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub old_path: String,
    pub new_path: String,
    pub version: DdVersion,
    pub kind: NbcChangeKind,
}

impl Annotation {
    pub fn renamed(old_path: &str, new_path: &str, version: DdVersion) -> Self {
        Self {
            old_path: old_path.to_string(),
            new_path: new_path.to_string(),
            version,
            kind: NbcChangeKind::Renamed,
        }
    }

    pub fn type_changed(path: &str, version: DdVersion) -> Self {
        Self {
            old_path: path.to_string(),
            new_path: path.to_string(),
            version,
            kind: NbcChangeKind::TypeChanged,
        }
    }
}

/// A checked, version-sorted set of annotations for one dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
}

impl AnnotationSet {
    /// Checks and sorts `annotations`.
    ///
    /// Fails when two annotations give one path different fates in the same
    /// version, or when a chain of renames runs backwards in version.
    pub fn new(mut annotations: Vec<Annotation>) -> MappingResult<Self> {
        for a in &annotations {
            if a.old_path.is_empty() || a.new_path.is_empty() {
                return Err(MappingError::InvalidAnnotation(
                    format!("{} -> {}", a.old_path, a.new_path),
                    "empty path".to_string(),
                ));
            }
            if a.kind == NbcChangeKind::Renamed && a.old_path == a.new_path {
                return Err(MappingError::InvalidAnnotation(
                    a.old_path.clone(),
                    "rename to itself".to_string(),
                ));
            }
        }

        annotations.sort_by(|a, b| {
            (a.version, &a.old_path, &a.new_path).cmp(&(b.version, &b.old_path, &b.new_path))
        });
        annotations.dedup();

        let mut by_old: HashMap<(&str, DdVersion), &Annotation> = HashMap::new();
        let mut by_new: HashMap<(&str, DdVersion), &Annotation> = HashMap::new();
        for a in &annotations {
            if let Some(other) = by_old.insert((a.old_path.as_str(), a.version), a) {
                return Err(MappingError::Ambiguous {
                    path: a.old_path.clone(),
                    version: a.version,
                    a: other.new_path.clone(),
                    b: a.new_path.clone(),
                });
            }
            if let Some(other) = by_new.insert((a.new_path.as_str(), a.version), a) {
                return Err(MappingError::Ambiguous {
                    path: a.new_path.clone(),
                    version: a.version,
                    a: other.old_path.clone(),
                    b: a.old_path.clone(),
                });
            }
        }

        // A rename into `p` must come strictly before any later change of `p`
        for a in &annotations {
            if a.kind != NbcChangeKind::Renamed {
                continue;
            }
            for b in &annotations {
                if b.old_path == a.new_path && b.version <= a.version && !std::ptr::eq(a, b) {
                    return Err(MappingError::MisOrdered {
                        path: a.new_path.clone(),
                        first: a.version,
                        second: b.version,
                    });
                }
            }
        }

        Ok(Self { annotations })
    }

    /// Collects the `nbc` history recorded on every descriptor of `schema`.
    ///
    /// A descriptor's history lists earlier names oldest first; each entry
    /// renames to the next entry's name, the last to the descriptor's path.
    pub fn from_schema(schema: &DatasetSchema) -> MappingResult<Self> {
        let mut annotations = Vec::new();
        for descriptor in schema.descriptors() {
            let mut history = descriptor.nbc.clone();
            history.sort_by_key(|change| change.version);
            for (i, change) in history.iter().enumerate() {
                let new_path = history
                    .get(i + 1)
                    .map(|next| next.previous_name.clone())
                    .unwrap_or_else(|| descriptor.path.clone());
                let annotation = match change.change {
                    NbcChangeKind::TypeChanged => {
                        Annotation::type_changed(&change.previous_name, change.version)
                    }
                    NbcChangeKind::Renamed if change.previous_name == new_path => continue,
                    NbcChangeKind::Renamed => {
                        Annotation::renamed(&change.previous_name, &new_path, change.version)
                    }
                };
                annotations.push(annotation);
            }
        }
        Self::new(annotations)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Annotations in ascending version order
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    /// Annotations with `lower < version <= upper`, grouped by version
    pub(crate) fn steps(&self, lower: DdVersion, upper: DdVersion) -> Vec<Vec<&Annotation>> {
        let mut steps: Vec<Vec<&Annotation>> = Vec::new();
        for a in self.annotations.iter().filter(|a| lower < a.version && a.version <= upper) {
            match steps.last_mut() {
                Some(step) if step[0].version == a.version => step.push(a),
                _ => steps.push(vec![a]),
            }
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures;

    const V1: DdVersion = DdVersion::new(1, 0, 0);
    const V2: DdVersion = DdVersion::new(2, 0, 0);
    const V3: DdVersion = DdVersion::new(3, 0, 0);

    #[test]
    fn test_sorted_by_version() {
        let set = AnnotationSet::new(vec![
            Annotation::renamed("b", "c", V3),
            Annotation::renamed("a", "b", V2),
        ])
        .unwrap();
        let versions: Vec<_> = set.iter().map(|a| a.version).collect();
        assert_eq!(versions, vec![V2, V3]);
    }

    #[test]
    fn test_misordered_chain() {
        let err = AnnotationSet::new(vec![
            Annotation::renamed("a", "b", V3),
            Annotation::renamed("b", "c", V2),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            MappingError::MisOrdered {
                path: "b".into(),
                first: V3,
                second: V2
            }
        );
    }

    #[test]
    fn test_same_version_chain_is_misordered() {
        let err = AnnotationSet::new(vec![
            Annotation::renamed("a", "b", V2),
            Annotation::renamed("b", "c", V2),
        ])
        .unwrap_err();
        assert!(matches!(err, MappingError::MisOrdered { .. }));
    }

    #[test]
    fn test_ambiguous_split_and_merge() {
        let split = AnnotationSet::new(vec![
            Annotation::renamed("a", "b", V2),
            Annotation::renamed("a", "c", V2),
        ]);
        assert!(matches!(split, Err(MappingError::Ambiguous { .. })));

        let merge = AnnotationSet::new(vec![
            Annotation::renamed("a", "c", V2),
            Annotation::renamed("b", "c", V2),
        ]);
        assert!(matches!(merge, Err(MappingError::Ambiguous { .. })));
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = AnnotationSet::new(vec![
            Annotation::renamed("a", "b", V2),
            Annotation::renamed("a", "b", V2),
        ])
        .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_invalid_annotations() {
        assert!(AnnotationSet::new(vec![Annotation::renamed("a", "a", V2)]).is_err());
        assert!(AnnotationSet::new(vec![Annotation::renamed("", "a", V2)]).is_err());
    }

    #[test]
    fn test_from_schema() {
        let schema = fixtures::dictionary_v2().dataset("core_profiles").unwrap();
        let set = AnnotationSet::from_schema(&schema).unwrap();
        assert!(set
            .iter()
            .any(|a| a.old_path == "profiles_1d/ion/label" && a.new_path == "profiles_1d/ion/name"));
        assert!(set
            .iter()
            .any(|a| a.kind == NbcChangeKind::TypeChanged && a.old_path == "profiles_1d/zeff_flag"));
    }

    #[test]
    fn test_steps_window() {
        let set = AnnotationSet::new(vec![
            Annotation::renamed("a", "b", V2),
            Annotation::renamed("x", "y", V2),
            Annotation::renamed("b", "c", V3),
        ])
        .unwrap();
        let steps = set.steps(V1, V2);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].len(), 2);
        assert_eq!(set.steps(V1, V3).len(), 2);
        assert!(set.steps(V3, V3).is_empty());
    }
}
