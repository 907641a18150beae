//! Predicted on-disk layout of a dataset
//!
//! Both the encoder and the validator derive dimension names and coordinate
//! annotations from here, so what is written is by construction what is
//! expected on read.
//!
//! Naming:
//! - a struct array level is `time` when the dataset is homogeneous and the
//!   array is time-dependent, else `<aos path>:i`
//! - data axis `j` of a leaf is `time` when homogeneous and coordinate `j`
//!   is a time base, else `<leaf path>:j`
//! - the last dimension of a `:shape` table is `<n>D`

use crate::schema::{is_time_coordinate, DatasetSchema, Descriptor};
use crate::tree::TimeMode;

/// Name of the shared time dimension in homogeneous datasets
pub const TIME_DIMENSION: &str = "time";

#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    schema: &'a DatasetSchema,
    homogeneous: bool,
}

impl<'a> Layout<'a> {
    pub fn new(schema: &'a DatasetSchema, mode: TimeMode) -> Self {
        Self {
            schema,
            homogeneous: mode == TimeMode::Homogeneous,
        }
    }

    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    /// Dimension indexing the elements of the struct array `aos`
    pub fn aos_dimension(&self, aos: &Descriptor) -> String {
        if self.homogeneous && aos.is_time_dependent() {
            TIME_DIMENSION.to_string()
        } else {
            format!("{}:i", aos.path)
        }
    }

    /// Dimensions of the struct arrays enclosing `path`, outermost first
    pub fn aos_dimensions(&self, path: &str) -> Vec<String> {
        self.schema
            .aos_ancestors(path)
            .iter()
            .map(|aos| self.aos_dimension(aos))
            .collect()
    }

    /// Dimension of data axis `axis` of a leaf
    pub fn axis_dimension(&self, leaf: &Descriptor, axis: usize) -> String {
        if self.homogeneous && (leaf.coordinate_is_time(axis) || leaf.is_timebase()) {
            TIME_DIMENSION.to_string()
        } else {
            format!("{}:{}", leaf.path, axis)
        }
    }

    /// Dimensions of the variable stored for `descriptor`.
    ///
    /// Struct arrays are stored as scalar markers, so they have none; their
    /// sizes live in [`Layout::aos_dimension`].
    pub fn dimensions(&self, descriptor: &Descriptor) -> Vec<String> {
        if !descriptor.kind.is_data() {
            return Vec::new();
        }
        let mut dims = self.aos_dimensions(&descriptor.path);
        dims.extend((0..descriptor.ndim).map(|j| self.axis_dimension(descriptor, j)));
        dims
    }

    /// Dimensions of the `:shape` table of a sparse variable
    pub fn shape_dimensions(&self, descriptor: &Descriptor) -> Vec<String> {
        let mut dims = self.aos_dimensions(&descriptor.path);
        dims.push(rank_dimension(descriptor.ndim));
        dims
    }

    /// Coordinate variables of a data leaf, in order and without duplicates
    pub fn coordinates(&self, descriptor: &Descriptor) -> Vec<String> {
        if !descriptor.kind.is_data() {
            return Vec::new();
        }
        let mut coordinates: Vec<String> = Vec::new();
        let mut push = |c: String| {
            if c != descriptor.path && !coordinates.contains(&c) {
                coordinates.push(c);
            }
        };

        for aos in self.schema.aos_ancestors(&descriptor.path) {
            if !aos.is_time_dependent() {
                continue;
            }
            if self.homogeneous {
                push(TIME_DIMENSION.to_string());
            } else if aos.has_child("time") {
                push(format!("{}/time", aos.path));
            }
        }

        for coordinate in &descriptor.coordinates {
            if coordinate.starts_with("1...") {
                continue;
            }
            if self.homogeneous && is_time_coordinate(coordinate) {
                push(TIME_DIMENSION.to_string());
            } else {
                push(coordinate.clone());
            }
        }
        coordinates
    }
}

/// `<n>D`
pub fn rank_dimension(ndim: usize) -> String {
    format!("{}D", ndim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures;
    use std::sync::Arc;

    fn schema() -> Arc<DatasetSchema> {
        fixtures::dictionary_v1().dataset("core_profiles").unwrap()
    }

    #[test]
    fn test_homogeneous_dimensions() {
        let schema = schema();
        let layout = Layout::new(&schema, TimeMode::Homogeneous);
        let dims = |p: &str| layout.dimensions(schema.get(p).unwrap());

        assert_eq!(dims("time"), vec!["time"]);
        assert_eq!(dims("global_quantities/ip"), vec!["time"]);
        assert_eq!(dims("profiles_1d/time"), vec!["time"]);
        assert_eq!(
            dims("profiles_1d/grid/rho_tor_norm"),
            vec!["time", "profiles_1d/grid/rho_tor_norm:0"]
        );
        assert_eq!(
            dims("profiles_1d/ion/element/a"),
            vec!["time", "profiles_1d/ion:i", "profiles_1d/ion/element:i"]
        );
        assert!(dims("profiles_1d/ion").is_empty());
        assert_eq!(dims("covariance"), vec!["covariance:0", "covariance:1"]);
    }

    #[test]
    fn test_heterogeneous_dimensions() {
        let schema = schema();
        let layout = Layout::new(&schema, TimeMode::Heterogeneous);
        let dims = |p: &str| layout.dimensions(schema.get(p).unwrap());

        assert_eq!(dims("time"), vec!["time:0"]);
        assert_eq!(dims("global_quantities/ip"), vec!["global_quantities/ip:0"]);
        assert_eq!(dims("profiles_1d/zeff_flag"), vec!["profiles_1d:i"]);
    }

    #[test]
    fn test_shape_dimensions() {
        let schema = schema();
        let layout = Layout::new(&schema, TimeMode::Homogeneous);
        let ion = schema.get("profiles_1d/ion").unwrap();
        assert_eq!(layout.shape_dimensions(ion), vec!["time", "1D"]);
        let temperature = schema.get("profiles_1d/ion/temperature").unwrap();
        assert_eq!(
            layout.shape_dimensions(temperature),
            vec!["time", "profiles_1d/ion:i", "1D"]
        );
    }

    #[test]
    fn test_coordinates() {
        let schema = schema();
        let homogeneous = Layout::new(&schema, TimeMode::Homogeneous);
        let heterogeneous = Layout::new(&schema, TimeMode::Heterogeneous);
        let psi = schema.get("profiles_1d/grid/psi").unwrap();

        assert_eq!(
            homogeneous.coordinates(psi),
            vec!["time", "profiles_1d/grid/rho_tor_norm"]
        );
        assert_eq!(
            heterogeneous.coordinates(psi),
            vec!["profiles_1d/time", "profiles_1d/grid/rho_tor_norm"]
        );

        let ip = schema.get("global_quantities/ip").unwrap();
        assert_eq!(heterogeneous.coordinates(ip), vec!["time"]);
        assert!(homogeneous.coordinates(schema.get("time").unwrap()).is_empty());
        assert!(homogeneous.coordinates(schema.get("covariance").unwrap()).is_empty());
    }
}
