//! Schema error types
//!
//! Error codes:
//! - DDT_SCHEMA_MALFORMED (FATAL)
//! - DDT_SCHEMA_UNKNOWN_DATA_TYPE (FATAL)
//! - DDT_SCHEMA_DUPLICATE_PATH (FATAL)
//! - DDT_SCHEMA_INVALID_VERSION (FATAL)
//! - DDT_SCHEMA_UNKNOWN_VERSION (REJECT)
//! - DDT_SCHEMA_UNKNOWN_DATASET (REJECT)
//! - DDT_SCHEMA_UNKNOWN_PATH (REJECT)
//!
//! Build-time failures are fatal: a Data Dictionary that fails to parse is
//! reported once and the failure is cached by the loader.

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Lookup rejected, the dictionary itself is fine
    Reject,
    /// The dictionary cannot be used at all
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema document could not be read or parsed
    MalformedSchema,
    /// A `data_type` token is not recognised
    UnknownDataType,
    /// Two nodes resolve to the same path
    DuplicatePath,
    /// A version string is not `major.minor.patch`
    InvalidVersion,
    /// No dictionary is known for the requested version
    UnknownVersion,
    /// The dictionary has no dataset with the requested name
    UnknownDataset,
    /// The dataset has no node at the requested path
    UnknownPath,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::MalformedSchema => "DDT_SCHEMA_MALFORMED",
            SchemaErrorCode::UnknownDataType => "DDT_SCHEMA_UNKNOWN_DATA_TYPE",
            SchemaErrorCode::DuplicatePath => "DDT_SCHEMA_DUPLICATE_PATH",
            SchemaErrorCode::InvalidVersion => "DDT_SCHEMA_INVALID_VERSION",
            SchemaErrorCode::UnknownVersion => "DDT_SCHEMA_UNKNOWN_VERSION",
            SchemaErrorCode::UnknownDataset => "DDT_SCHEMA_UNKNOWN_DATASET",
            SchemaErrorCode::UnknownPath => "DDT_SCHEMA_UNKNOWN_PATH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::UnknownVersion
            | SchemaErrorCode::UnknownDataset
            | SchemaErrorCode::UnknownPath => Severity::Reject,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Dictionary version if applicable
    version: Option<String>,
    /// Node path if applicable
    path: Option<String>,
}

impl SchemaError {
    /// Create an error for an unreadable or unparsable schema document
    pub fn malformed_schema(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::MalformedSchema,
            message: format!("Malformed schema '{}': {}", source.into(), reason.into()),
            version: None,
            path: None,
        }
    }

    /// Create an error for an unrecognised data type token
    pub fn unknown_data_type(path: impl Into<String>, token: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            code: SchemaErrorCode::UnknownDataType,
            message: format!("Unknown data type '{}' at '{}'", token.into(), path),
            version: None,
            path: Some(path),
        }
    }

    /// Create an error for a path defined twice
    pub fn duplicate_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            code: SchemaErrorCode::DuplicatePath,
            message: format!("Path '{}' is defined more than once", path),
            version: None,
            path: Some(path),
        }
    }

    /// Create an error for a version string that does not parse
    pub fn invalid_version(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            code: SchemaErrorCode::InvalidVersion,
            message: format!("Invalid version string '{}'", version),
            version: Some(version),
            path: None,
        }
    }

    /// Create an unknown version error
    pub fn unknown_version(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            code: SchemaErrorCode::UnknownVersion,
            message: format!("Data Dictionary version '{}' not found", version),
            version: Some(version),
            path: None,
        }
    }

    /// Create an unknown dataset error
    pub fn unknown_dataset(version: impl Into<String>, dataset: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            code: SchemaErrorCode::UnknownDataset,
            message: format!(
                "Dataset '{}' not defined in Data Dictionary version '{}'",
                dataset.into(),
                version
            ),
            version: Some(version),
            path: None,
        }
    }

    /// Create an unknown path error
    pub fn unknown_path(dataset: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            code: SchemaErrorCode::UnknownPath,
            message: format!("Dataset '{}' has no node '{}'", dataset.into(), path),
            version: None,
            path: Some(path),
        }
    }

    /// Attach the dictionary version this error was raised for
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the dictionary version if applicable
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the node path if applicable
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref version) = self.version {
            write!(f, " (dd version {})", version)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::MalformedSchema.code(), "DDT_SCHEMA_MALFORMED");
        assert_eq!(SchemaErrorCode::UnknownDataType.code(), "DDT_SCHEMA_UNKNOWN_DATA_TYPE");
        assert_eq!(SchemaErrorCode::UnknownPath.code(), "DDT_SCHEMA_UNKNOWN_PATH");
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(SchemaErrorCode::UnknownDataType.severity(), Severity::Fatal);
        assert_eq!(SchemaErrorCode::DuplicatePath.severity(), Severity::Fatal);
        assert_eq!(SchemaErrorCode::UnknownPath.severity(), Severity::Reject);
        assert_eq!(SchemaErrorCode::UnknownVersion.severity(), Severity::Reject);
    }

    #[test]
    fn test_display_includes_version() {
        let err = SchemaError::unknown_data_type("time", "FLT_9D").with_version("3.39.0");
        let display = format!("{}", err);
        assert!(display.contains("FATAL"));
        assert!(display.contains("FLT_9D"));
        assert!(display.contains("3.39.0"));
        assert_eq!(err.path(), Some("time"));
    }
}
