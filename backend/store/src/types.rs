use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkdrop_core::{RecipientId, RelayPayload};

/// Persisted position of a broadcast, enough to pick it up after a crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastCheckpoint {
    pub id: String,
    /// Operator chat that started the broadcast and receives its report.
    pub operator: RecipientId,
    pub payload: RelayPayload,
    /// Recipient snapshot taken when the broadcast started.
    pub recipients: Vec<RecipientId>,
    /// Index into `recipients` of the next attempt.
    pub next_index: usize,
    pub delivered: u64,
    pub blocked: u64,
    pub failed: u64,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BroadcastCheckpoint {
    pub fn remaining(&self) -> usize {
        self.recipients.len().saturating_sub(self.next_index)
    }
}
