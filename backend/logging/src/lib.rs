//! Telemetry and structured logging components for linkdrop.
//!
//! Handles log redaction, JSON output generation, file rotation, and relay event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, RelayEvent};
pub use logger::{init_logger, LogOptions};
pub use redact::redact_sensitive_data;
