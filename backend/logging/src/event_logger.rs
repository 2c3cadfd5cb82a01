//! Relay Event Logger
//!
//! Structured relay events (uploads, resolutions, broadcasts) emitted under the
//! `relay_events` target so they can be filtered into their own stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    Upload {
        code: String,
        kind: String,
    },
    Deleted {
        code: String,
    },
    Resolution {
        recipient: i64,
        code: String,
        outcome: String,
        detail: Option<String>,
    },
    GateToggled {
        required: bool,
    },
    Broadcast {
        id: String,
        total: u64,
        delivered: u64,
        blocked: u64,
        failed: u64,
        cancelled: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: RelayEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Logs a relay event, scrubbing free-form detail first.
    pub fn log_event(mut event: RelayEvent) {
        if let RelayEvent::Resolution { detail: Some(detail), .. } = &mut event {
            *detail = redact_sensitive_data(detail);
        }

        let entry = EventLogEntry { timestamp: Utc::now(), event };
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "relay_events", event = %json, "Relay event");
    }
}
