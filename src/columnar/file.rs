//! In-memory columnar files

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::errors::{ColumnarError, ColumnarResult};
use super::store::{element_count, VariableStore};
use super::variable::{VariableData, VariableHeader};
use crate::schema::DdVersion;

/// A variable with its data
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub header: VariableHeader,
    pub data: Arc<VariableData>,
}

/// A complete columnar file held in memory.
///
/// Every variable's dimensions are declared on the file and its data length
/// equals the product of their sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarFile {
    dataset: String,
    version: DdVersion,
    created: DateTime<Utc>,
    dimensions: BTreeMap<String, usize>,
    variables: BTreeMap<String, Variable>,
}

impl ColumnarFile {
    pub fn new(dataset: impl Into<String>, version: DdVersion) -> Self {
        Self::with_created(dataset, version, Utc::now())
    }

    pub(crate) fn with_created(
        dataset: impl Into<String>,
        version: DdVersion,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            version,
            created,
            dimensions: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn dimensions(&self) -> &BTreeMap<String, usize> {
        &self.dimensions
    }

    /// Declares a dimension; redeclaring with another size fails
    pub fn add_dimension(&mut self, name: &str, size: usize) -> ColumnarResult<()> {
        match self.dimensions.get(name) {
            Some(&existing) if existing != size => Err(ColumnarError::invalid_variable(
                name,
                format!("dimension redeclared with size {} (was {})", size, existing),
            )),
            Some(_) => Ok(()),
            None => {
                self.dimensions.insert(name.to_string(), size);
                Ok(())
            }
        }
    }

    /// Adds a variable after checking it against the declared dimensions
    pub fn add_variable(&mut self, header: VariableHeader, data: VariableData) -> ColumnarResult<()> {
        if self.variables.contains_key(&header.name) {
            return Err(ColumnarError::invalid_variable(&header.name, "variable defined twice"));
        }
        if header.dtype != data.dtype() {
            return Err(ColumnarError::invalid_variable(
                &header.name,
                format!(
                    "declared {} but data is {}",
                    header.dtype.as_str(),
                    data.dtype().as_str()
                ),
            ));
        }
        let expected = element_count(&header.name, &self.shape_of(&header)?)?;
        if data.len() != expected {
            return Err(ColumnarError::invalid_variable(
                &header.name,
                format!("{} elements for a shape of {} elements", data.len(), expected),
            ));
        }
        self.insert_unchecked(header, Arc::new(data));
        Ok(())
    }

    pub(crate) fn insert_unchecked(&mut self, header: VariableHeader, data: Arc<VariableData>) {
        self.variables
            .insert(header.name.clone(), Variable { header, data });
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Mutable access; the caller keeps dimensions and data consistent
    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(name)
    }

    /// Variables in name order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn shape_of(&self, header: &VariableHeader) -> ColumnarResult<Vec<usize>> {
        header
            .dimensions
            .iter()
            .map(|d| {
                self.dimensions.get(d).copied().ok_or_else(|| {
                    ColumnarError::invalid_variable(
                        &header.name,
                        format!("undeclared dimension '{}'", d),
                    )
                })
            })
            .collect()
    }
}

impl VariableStore for ColumnarFile {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn version(&self) -> DdVersion {
        self.version
    }

    fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).copied()
    }

    fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    fn header(&self, name: &str) -> Option<&VariableHeader> {
        self.variables.get(name).map(|v| &v.header)
    }

    fn read(&self, name: &str) -> ColumnarResult<Arc<VariableData>> {
        self.variables
            .get(name)
            .map(|v| Arc::clone(&v.data))
            .ok_or_else(|| ColumnarError::unknown_variable(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::{ColumnarErrorCode, DType};

    fn file() -> ColumnarFile {
        let mut file = ColumnarFile::new("core_profiles", DdVersion::new(1, 0, 0));
        file.add_dimension("time", 3).unwrap();
        file
    }

    #[test]
    fn test_add_variable_checks_shape() {
        let mut file = file();
        let header = VariableHeader::new("time", DType::F64, vec!["time".into()]);
        let err = file
            .add_variable(header.clone(), VariableData::Float(vec![1.0]))
            .unwrap_err();
        assert_eq!(err.code(), ColumnarErrorCode::InvalidVariable);

        file.add_variable(header, VariableData::Float(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(file.shape("time").unwrap(), vec![3]);
    }

    #[test]
    fn test_add_variable_checks_dtype_and_dimensions() {
        let mut file = file();
        let wrong_type = VariableHeader::new("x", DType::I32, vec!["time".into()]);
        assert!(file
            .add_variable(wrong_type, VariableData::Float(vec![0.0; 3]))
            .is_err());
        let undeclared = VariableHeader::new("y", DType::F64, vec!["y:0".into()]);
        assert!(file
            .add_variable(undeclared, VariableData::Float(vec![]))
            .is_err());
    }

    #[test]
    fn test_dimension_redeclaration() {
        let mut file = file();
        file.add_dimension("time", 3).unwrap();
        assert!(file.add_dimension("time", 4).is_err());
    }

    #[test]
    fn test_store_reads() {
        let mut file = file();
        file.add_variable(
            VariableHeader::new("ids_properties/homogeneous_time", DType::I32, vec![]),
            VariableData::Int(vec![1]),
        )
        .unwrap();
        assert_eq!(file.variable_names(), vec!["ids_properties/homogeneous_time"]);
        assert_eq!(*file.read("ids_properties/homogeneous_time").unwrap(), VariableData::Int(vec![1]));
        assert_eq!(
            file.read("nope").unwrap_err().code(),
            ColumnarErrorCode::UnknownVariable
        );
    }
}
