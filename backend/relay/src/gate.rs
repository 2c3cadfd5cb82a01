//! Access gate: optional membership requirement in front of link resolution.
//!
//! The gate fails open. If the membership oracle errors or exceeds its
//! timeout, the recipient is allowed through and a warning is logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use linkdrop_core::{MembershipOracle, RecipientId};
use linkdrop_logging::{EventLogger, RelayEvent};

pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// Recipient must join `target` first.
    Denied { target: String },
}

pub struct AccessGate {
    required: AtomicBool,
    exempt: RecipientId,
    target: Option<String>,
    oracle: Arc<dyn MembershipOracle>,
    timeout: Duration,
}

impl AccessGate {
    /// New gate, initially not required.
    pub fn new(oracle: Arc<dyn MembershipOracle>, exempt: RecipientId, target: Option<String>) -> Self {
        Self {
            required: AtomicBool::new(false),
            exempt,
            target: target.filter(|t| !t.trim().is_empty()),
            oracle,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_required(self, required: bool) -> Self {
        self.required.store(required, Ordering::SeqCst);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.load(Ordering::SeqCst)
    }

    pub fn set_required(&self, required: bool) {
        self.required.store(required, Ordering::SeqCst);
        info!(required, "Gate requirement set");
        EventLogger::log_event(RelayEvent::GateToggled { required });
    }

    /// Flip the requirement; returns the new value.
    pub fn toggle(&self) -> bool {
        let required = !self.required.fetch_xor(true, Ordering::SeqCst);
        info!(required, "Gate requirement toggled");
        EventLogger::log_event(RelayEvent::GateToggled { required });
        required
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub async fn check(&self, recipient: RecipientId) -> GateDecision {
        if !self.is_required() || recipient == self.exempt {
            return GateDecision::Allowed;
        }
        let Some(target) = &self.target else {
            warn!("Gate is required but no target is configured; allowing");
            return GateDecision::Allowed;
        };

        match tokio::time::timeout(self.timeout, self.oracle.is_member(recipient, target)).await {
            Ok(Ok(true)) => GateDecision::Allowed,
            Ok(Ok(false)) => {
                debug!(recipient = %recipient, target = %target, "Gate denied");
                GateDecision::Denied { target: target.clone() }
            }
            Ok(Err(e)) => {
                warn!(recipient = %recipient, error = %e, "Membership check failed; failing open");
                GateDecision::Allowed
            }
            Err(_) => {
                warn!(
                    recipient = %recipient,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Membership check timed out; failing open"
                );
                GateDecision::Allowed
            }
        }
    }
}
