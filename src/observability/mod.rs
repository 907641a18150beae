//! Observability for ddtree
//!
//! Structured JSON log lines, typed events and begin/complete scopes.
//! Observability is read-only: nothing here changes what the caller's
//! operation returns, and a failed log write is ignored.
//!
//! ```ignore
//! use ddtree::observability::{log_event, Event, ObservationScope};
//!
//! log_event(Event::PathDropped, &[("path", "old/name")]);
//!
//! let scope = ObservationScope::new("ENCODE");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

#[cfg(test)]
pub(crate) use logger::capture_log;

/// Log a typed event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::event(event, fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::SchemaLoaded, &[("version", "3.39.0")]);
        log_event(Event::ValidationDisabled, &[]);
    }

    #[test]
    fn test_capture_typed_event() {
        let event = Event::IdentifierDescriptionMismatch;
        let line = capture_log(event.severity(), event.as_str(), &[("index", "1")]);
        assert!(line.contains("\"severity\":\"WARN\""));
    }
}
