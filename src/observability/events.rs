//! Observable events for ddtree
//!
//! Events are explicit and typed. Each event carries its own severity so call
//! sites never pick one ad hoc.

use std::fmt;

use super::logger::Severity;

/// Observable events raised by the schema, migration and codec layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schema
    /// A Data Dictionary version was parsed and cached
    SchemaLoaded,
    /// A Data Dictionary version failed to parse; the failure is cached
    SchemaLoadFailed,

    // Migration
    /// A version path map was built for a version pair
    PathMapBuilt,
    /// A source path has no equivalent in the target version
    PathDropped,
    /// A source path changed type and is not converted
    PathTypeChanged,
    /// A source path moved across a different number of struct arrays
    PathDepthChanged,

    // Container
    /// A columnar file was written and synced
    ColumnarWritten,
    /// A columnar file header was read
    ColumnarOpened,
    /// A checksum mismatch was detected in a columnar file
    ColumnarCorruption,

    // Codec
    /// Pre-decode validation was switched off
    ValidationDisabled,
    /// A variable's documentation differs from the dictionary
    DocumentationMismatch,
    /// A node was materialized from a deferred source
    LazyMaterialized,

    // Tree
    /// Identifier descriptions differ but the identifiers still compare equal
    IdentifierDescriptionMismatch,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::SchemaLoadFailed => "SCHEMA_LOAD_FAILED",

            Event::PathMapBuilt => "PATH_MAP_BUILT",
            Event::PathDropped => "PATH_DROPPED",
            Event::PathTypeChanged => "PATH_TYPE_CHANGED",
            Event::PathDepthChanged => "PATH_DEPTH_CHANGED",

            Event::ColumnarWritten => "COLUMNAR_WRITTEN",
            Event::ColumnarOpened => "COLUMNAR_OPENED",
            Event::ColumnarCorruption => "COLUMNAR_CORRUPTION",

            Event::ValidationDisabled => "VALIDATION_DISABLED",
            Event::DocumentationMismatch => "DOCUMENTATION_MISMATCH",
            Event::LazyMaterialized => "LAZY_MATERIALIZED",

            Event::IdentifierDescriptionMismatch => "IDENTIFIER_DESCRIPTION_MISMATCH",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::LazyMaterialized => Severity::Trace,
            Event::ValidationDisabled
            | Event::DocumentationMismatch
            | Event::PathDepthChanged
            | Event::IdentifierDescriptionMismatch => Severity::Warn,
            Event::SchemaLoadFailed => Severity::Error,
            Event::ColumnarCorruption => Severity::Fatal,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Event; 13] = [
        Event::SchemaLoaded,
        Event::SchemaLoadFailed,
        Event::PathMapBuilt,
        Event::PathDropped,
        Event::PathTypeChanged,
        Event::PathDepthChanged,
        Event::ColumnarWritten,
        Event::ColumnarOpened,
        Event::ColumnarCorruption,
        Event::ValidationDisabled,
        Event::DocumentationMismatch,
        Event::LazyMaterialized,
        Event::IdentifierDescriptionMismatch,
    ];

    #[test]
    fn test_all_events_have_string_representation() {
        for event in ALL {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::ColumnarCorruption.is_fatal());
        assert!(!Event::PathDropped.is_fatal());
        assert!(!Event::ValidationDisabled.is_fatal());
    }

    #[test]
    fn test_warning_events() {
        assert_eq!(Event::ValidationDisabled.severity(), Severity::Warn);
        assert_eq!(Event::IdentifierDescriptionMismatch.severity(), Severity::Warn);
        assert_eq!(Event::PathDropped.severity(), Severity::Info);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::PathMapBuilt), "PATH_MAP_BUILT");
    }
}
