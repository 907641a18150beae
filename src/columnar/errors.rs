//! Columnar container error types
//!
//! Error codes:
//! - DDT_COLUMNAR_IO_ERROR (ERROR)
//! - DDT_COLUMNAR_WRITE_FAILED (ERROR)
//! - DDT_COLUMNAR_READ_FAILED (ERROR)
//! - DDT_COLUMNAR_UNSUPPORTED_FORMAT (ERROR)
//! - DDT_COLUMNAR_UNKNOWN_VARIABLE (ERROR)
//! - DDT_COLUMNAR_INVALID_VARIABLE (ERROR)
//! - DDT_DATA_CORRUPTION (FATAL)

use std::fmt;
use std::io;

/// Severity levels for columnar errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation fails, the file may still be usable
    Error,
    /// The file cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Columnar-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnarErrorCode {
    /// Disk I/O failure
    IoError,
    /// Writing or syncing a file failed
    WriteFailed,
    /// Reading a file failed
    ReadFailed,
    /// Bad magic or format version
    UnsupportedFormat,
    /// No variable with the requested name
    UnknownVariable,
    /// A variable is inconsistent with its dimensions or dtype
    InvalidVariable,
    /// Checksum failure or truncated data
    DataCorruption,
}

impl ColumnarErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ColumnarErrorCode::IoError => "DDT_COLUMNAR_IO_ERROR",
            ColumnarErrorCode::WriteFailed => "DDT_COLUMNAR_WRITE_FAILED",
            ColumnarErrorCode::ReadFailed => "DDT_COLUMNAR_READ_FAILED",
            ColumnarErrorCode::UnsupportedFormat => "DDT_COLUMNAR_UNSUPPORTED_FORMAT",
            ColumnarErrorCode::UnknownVariable => "DDT_COLUMNAR_UNKNOWN_VARIABLE",
            ColumnarErrorCode::InvalidVariable => "DDT_COLUMNAR_INVALID_VARIABLE",
            ColumnarErrorCode::DataCorruption => "DDT_DATA_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ColumnarErrorCode::DataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ColumnarErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Columnar error with context
#[derive(Debug)]
pub struct ColumnarError {
    code: ColumnarErrorCode,
    message: String,
    /// Offset or variable the error was raised for
    details: Option<String>,
    source: Option<io::Error>,
}

impl ColumnarError {
    fn new(code: ColumnarErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    fn with_source(mut self, source: io::Error) -> Self {
        self.source = Some(source);
        self
    }

    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(ColumnarErrorCode::IoError, message).with_source(source)
    }

    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(ColumnarErrorCode::WriteFailed, message).with_source(source)
    }

    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(ColumnarErrorCode::ReadFailed, message).with_source(source)
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::new(ColumnarErrorCode::UnsupportedFormat, message)
    }

    pub fn unknown_variable(name: &str) -> Self {
        Self::new(
            ColumnarErrorCode::UnknownVariable,
            format!("No variable named '{}'", name),
        )
    }

    pub fn invalid_variable(name: &str, reason: impl Into<String>) -> Self {
        Self::new(ColumnarErrorCode::InvalidVariable, reason)
            .with_details(format!("variable: {}", name))
    }

    /// Create a data corruption error (FATAL)
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::new(ColumnarErrorCode::DataCorruption, message)
    }

    /// Create a data corruption error with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self::data_corruption(reason).with_details(format!("byte_offset: {}", offset))
    }

    /// Create a data corruption error with variable context
    pub fn corruption_for_variable(name: &str, reason: impl Into<String>) -> Self {
        Self::data_corruption(reason).with_details(format!("variable: {}", name))
    }

    pub fn code(&self) -> ColumnarErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ColumnarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ColumnarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for columnar operations
pub type ColumnarResult<T> = Result<T, ColumnarError>;
