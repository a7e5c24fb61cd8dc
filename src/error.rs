//! Unified error type for the traffic monitor's public surface.
//!
//! `MonitorError` is the single error type returned by the pull APIs of
//! [`crate::TrafficMonitor`] and by the counter sources. It serializes as
//! `{ "kind": "...", "message": "..." }` so a UI collaborator can
//! programmatically distinguish error categories.

use std::time::Duration;

use serde::ser::SerializeStruct;

/// Error returned by the monitor and the interface counter sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    /// No traffic result was published within the wait window.
    #[error("no traffic sample within {0:?}")]
    TimedOut(Duration),

    /// The monitor was stopped before it produced a result.
    #[error("traffic monitor is not running")]
    NotRunning,

    /// The OS interface list could not be obtained. Recovered inside the
    /// counter reader as a zero sample; never returned by the monitor.
    #[error("interface enumeration failed: {0}")]
    InterfaceEnumeration(String),
}

impl MonitorError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::TimedOut(_) => "TimedOut",
            MonitorError::NotRunning => "NotRunning",
            MonitorError::InterfaceEnumeration(_) => "InterfaceEnumeration",
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }`.
impl serde::Serialize for MonitorError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("MonitorError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::InterfaceEnumeration(err.to_string())
    }
}
