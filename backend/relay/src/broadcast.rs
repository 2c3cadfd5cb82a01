//! Broadcast fan-out.
//!
//! Relays one payload to every known recipient, strictly one at a time,
//! pausing after each batch to stay under the sender-side rate ceiling.
//! Per-recipient failures are classified and counted, never propagated.
//! A checkpoint is written at every batch boundary so an interrupted run
//! can be resumed with [`Broadcaster::begin_resume`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use linkdrop_core::{GatewayError, MessagingGateway, RecipientId, RelayError, RelayPayload};
use linkdrop_logging::{EventLogger, RelayEvent};
use linkdrop_store::{BroadcastCheckpoint, BroadcastLog};

use crate::directory::RecipientDirectory;
use crate::progress::{ProgressReporter, ProgressSnapshot};

// ----- Policy -----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPolicy {
    /// Attempts between cooldowns.
    pub batch_size: usize,
    pub cooldown: Duration,
    /// Attempts between progress updates.
    pub progress_every: usize,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self { batch_size: 25, cooldown: Duration::from_secs(1), progress_every: 50 }
    }
}

// ----- Report -----

/// Final accounting of one run.
///
/// `delivered + blocked + failed + remaining == total` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub id: String,
    pub total: u64,
    pub delivered: u64,
    pub blocked: u64,
    pub failed: u64,
    /// Recipients never attempted because the run was cancelled.
    pub remaining: u64,
    /// Cooldown pauses taken during this run.
    pub cooldowns: u64,
    pub cancelled: bool,
}

impl BroadcastReport {
    pub fn render(&self) -> String {
        let title = if self.cancelled { "🛑 Broadcast cancelled" } else { "✅ Broadcast finished" };
        let mut text = format!(
            "{title}\n\nTotal: {}\nDelivered: {}\nBlocked: {}\nFailed: {}",
            self.total, self.delivered, self.blocked, self.failed
        );
        if self.remaining > 0 {
            text.push_str(&format!("\nNot attempted: {}", self.remaining));
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    Blocked,
    Failed,
}

impl Outcome {
    pub fn classify(result: &Result<(), GatewayError>) -> Self {
        match result {
            Ok(()) => Outcome::Delivered,
            Err(e) if e.is_blocked() => Outcome::Blocked,
            Err(_) => Outcome::Failed,
        }
    }
}

// ----- Broadcaster -----

/// A reserved broadcast slot, ready to [`Broadcaster::run`].
pub struct BroadcastTicket {
    checkpoint: BroadcastCheckpoint,
    cancel: watch::Receiver<bool>,
}

impl BroadcastTicket {
    pub fn id(&self) -> &str {
        &self.checkpoint.id
    }

    pub fn total(&self) -> usize {
        self.checkpoint.recipients.len()
    }

    pub fn remaining(&self) -> usize {
        self.checkpoint.remaining()
    }
}

pub struct Broadcaster {
    directory: Arc<RecipientDirectory>,
    gateway: Arc<dyn MessagingGateway>,
    log: Arc<dyn BroadcastLog>,
    policy: BroadcastPolicy,
    /// Cancel switch of the run in flight, if any.
    running: Mutex<Option<watch::Sender<bool>>>,
}

impl Broadcaster {
    pub fn new(
        directory: Arc<RecipientDirectory>,
        gateway: Arc<dyn MessagingGateway>,
        log: Arc<dyn BroadcastLog>,
        policy: BroadcastPolicy,
    ) -> Self {
        Self { directory, gateway, log, policy, running: Mutex::new(None) }
    }

    pub fn policy(&self) -> &BroadcastPolicy {
        &self.policy
    }

    /// Reserve the broadcast slot and snapshot the recipient list.
    pub async fn begin(
        &self,
        operator: RecipientId,
        payload: RelayPayload,
    ) -> Result<BroadcastTicket, RelayError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(RelayError::BroadcastInProgress);
        }

        // A new broadcast supersedes whatever an interrupted one left behind.
        while let Some(stale) = self.log.pending().await? {
            warn!(
                id = %stale.id,
                remaining = stale.remaining(),
                "Discarding interrupted broadcast"
            );
            self.log.clear(&stale.id).await?;
        }

        let recipients = self.directory.snapshot().await?;
        let now = Utc::now();
        let checkpoint = BroadcastCheckpoint {
            id: Uuid::new_v4().to_string(),
            operator,
            payload,
            recipients,
            next_index: 0,
            delivered: 0,
            blocked: 0,
            failed: 0,
            started_at: now,
            updated_at: now,
        };
        self.log.save(&checkpoint).await?;

        let (tx, rx) = watch::channel(false);
        *running = Some(tx);
        info!(id = %checkpoint.id, total = checkpoint.recipients.len(), "Broadcast started");
        Ok(BroadcastTicket { checkpoint, cancel: rx })
    }

    /// Reserve the slot for the last interrupted broadcast.
    pub async fn begin_resume(&self, operator: RecipientId) -> Result<BroadcastTicket, RelayError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(RelayError::BroadcastInProgress);
        }

        let mut checkpoint = self.log.pending().await?.ok_or(RelayError::NothingToResume)?;
        checkpoint.operator = operator;

        let (tx, rx) = watch::channel(false);
        *running = Some(tx);
        info!(
            id = %checkpoint.id,
            next = checkpoint.next_index,
            remaining = checkpoint.remaining(),
            "Broadcast resumed"
        );
        Ok(BroadcastTicket { checkpoint, cancel: rx })
    }

    /// The checkpoint an interrupted broadcast left behind, if any.
    pub async fn pending(&self) -> Result<Option<BroadcastCheckpoint>, RelayError> {
        Ok(self.log.pending().await?)
    }

    /// `begin` followed by `run`.
    pub async fn broadcast(
        &self,
        operator: RecipientId,
        payload: RelayPayload,
    ) -> Result<BroadcastReport, RelayError> {
        let ticket = self.begin(operator, payload).await?;
        Ok(self.run(ticket).await)
    }

    /// Ask the running broadcast to stop. Returns false if none is running.
    pub async fn cancel(&self) -> bool {
        match self.running.lock().await.as_ref() {
            Some(tx) => {
                tx.send_replace(true);
                info!("Broadcast cancellation requested");
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Drive a reserved broadcast to completion or cancellation.
    pub async fn run(&self, ticket: BroadcastTicket) -> BroadcastReport {
        let BroadcastTicket { checkpoint: mut cp, mut cancel } = ticket;
        let total = cp.recipients.len();
        let progress = ProgressReporter::spawn(self.gateway.clone(), cp.operator);
        let batch_size = self.policy.batch_size.max(1);
        let progress_every = self.policy.progress_every.max(1);
        let mut cooldowns = 0u64;
        let mut cancelled = false;

        while cp.next_index < total {
            if *cancel.borrow() {
                cancelled = true;
                break;
            }

            let recipient = cp.recipients[cp.next_index];
            match self.attempt(recipient, &cp.payload).await {
                Outcome::Delivered => cp.delivered += 1,
                Outcome::Blocked => cp.blocked += 1,
                Outcome::Failed => cp.failed += 1,
            }
            cp.next_index += 1;
            let attempted = cp.next_index;

            if attempted % progress_every == 0 {
                progress.report(ProgressSnapshot {
                    attempted,
                    total,
                    delivered: cp.delivered,
                    blocked: cp.blocked,
                    failed: cp.failed,
                });
            }

            if attempted % batch_size == 0 && attempted < total {
                self.save_checkpoint(&mut cp).await;
                cooldowns += 1;
                debug!(id = %cp.id, attempted, "Cooling down");
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.cooldown) => {}
                    _ = cancel.wait_for(|stop| *stop) => {}
                }
            }
        }
        if !cancelled && *cancel.borrow() && cp.next_index < total {
            cancelled = true;
        }

        progress.finish().await;
        if let Err(e) = self.log.clear(&cp.id).await {
            warn!(id = %cp.id, error = %e, "Failed to clear broadcast checkpoint");
        }
        *self.running.lock().await = None;

        let report = BroadcastReport {
            id: cp.id.clone(),
            total: total as u64,
            delivered: cp.delivered,
            blocked: cp.blocked,
            failed: cp.failed,
            remaining: cp.remaining() as u64,
            cooldowns,
            cancelled,
        };
        info!(
            id = %report.id,
            total = report.total,
            delivered = report.delivered,
            blocked = report.blocked,
            failed = report.failed,
            cancelled = report.cancelled,
            "Broadcast finished"
        );
        EventLogger::log_event(RelayEvent::Broadcast {
            id: report.id.clone(),
            total: report.total,
            delivered: report.delivered,
            blocked: report.blocked,
            failed: report.failed,
            cancelled: report.cancelled,
        });
        report
    }

    async fn attempt(&self, recipient: RecipientId, payload: &RelayPayload) -> Outcome {
        let result = match self.gateway.relay(recipient, payload).await {
            Err(GatewayError::RateLimited(wait)) => {
                debug!(recipient = %recipient, wait_ms = wait.as_millis() as u64, "Rate limited, retrying once");
                tokio::time::sleep(wait).await;
                self.gateway.relay(recipient, payload).await
            }
            other => other,
        };
        let outcome = Outcome::classify(&result);
        if let Err(e) = &result {
            debug!(recipient = %recipient, outcome = ?outcome, error = %e, "Relay not delivered");
        }
        outcome
    }

    async fn save_checkpoint(&self, cp: &mut BroadcastCheckpoint) {
        cp.updated_at = Utc::now();
        if let Err(e) = self.log.save(cp).await {
            warn!(id = %cp.id, error = %e, "Failed to save broadcast checkpoint");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdrop_core::testkit::RecordingGateway;
    use linkdrop_store::InMemoryStore;

    const OPERATOR: RecipientId = RecipientId(1);
    const PAYLOAD: RelayPayload = RelayPayload { from_chat: 1, message_id: 99 };

    struct Harness {
        store: Arc<InMemoryStore>,
        gateway: Arc<RecordingGateway>,
        broadcaster: Arc<Broadcaster>,
    }

    async fn harness(recipients: i64, policy: BroadcastPolicy) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(RecipientDirectory::new(store.clone()));
        for id in 100..100 + recipients {
            directory.touch(RecipientId(id), "user", None).await.unwrap();
        }
        let gateway = Arc::new(RecordingGateway::new());
        let broadcaster = Arc::new(Broadcaster::new(directory, gateway.clone(), store.clone(), policy));
        Harness { store, gateway, broadcaster }
    }

    fn fast_policy() -> BroadcastPolicy {
        BroadcastPolicy { batch_size: 25, cooldown: Duration::from_millis(1), progress_every: 50 }
    }

    fn blocked() -> GatewayError {
        GatewayError::from_description("Forbidden: bot was blocked by the user")
    }

    #[tokio::test]
    async fn sixty_recipients_with_mixed_failures() {
        let h = harness(60, fast_policy()).await;
        for id in [105, 130, 159] {
            h.gateway.fail_relay_to(RecipientId(id), blocked());
        }
        for id in [110, 140] {
            h.gateway
                .fail_relay_to(RecipientId(id), GatewayError::Other("Bad Request: chat not found".into()));
        }

        let report = h.broadcaster.broadcast(OPERATOR, PAYLOAD).await.unwrap();
        assert_eq!(report.total, 60);
        assert_eq!(report.delivered, 55);
        assert_eq!(report.blocked, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.remaining, 0);
        assert_eq!(report.cooldowns, 2);
        assert!(!report.cancelled);
        assert_eq!(h.gateway.relays().len(), 55);
        assert!(h.gateway.relays().iter().all(|(_, p)| *p == PAYLOAD));
    }

    #[tokio::test]
    async fn empty_directory_reports_zero() {
        let h = harness(0, fast_policy()).await;
        let report = h.broadcaster.broadcast(OPERATOR, PAYLOAD).await.unwrap();
        assert_eq!(
            (report.total, report.delivered, report.blocked, report.failed, report.cooldowns),
            (0, 0, 0, 0, 0)
        );
    }

    #[tokio::test]
    async fn exact_batch_multiple_skips_trailing_cooldown() {
        let h = harness(50, fast_policy()).await;
        let report = h.broadcaster.broadcast(OPERATOR, PAYLOAD).await.unwrap();
        assert_eq!(report.cooldowns, 1);
        assert_eq!(report.delivered, 50);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_once() {
        let h = harness(3, fast_policy()).await;
        h.gateway.throttle_once(RecipientId(101));
        let report = h.broadcaster.broadcast(OPERATOR, PAYLOAD).await.unwrap();
        assert_eq!(report.delivered, 3);
    }

    #[tokio::test]
    async fn second_broadcast_is_rejected_while_one_runs() {
        let h = harness(2, fast_policy()).await;
        let ticket = h.broadcaster.begin(OPERATOR, PAYLOAD).await.unwrap();
        assert!(matches!(
            h.broadcaster.begin(OPERATOR, PAYLOAD).await,
            Err(RelayError::BroadcastInProgress)
        ));
        h.broadcaster.run(ticket).await;
        assert!(!h.broadcaster.is_running().await);
        assert!(h.broadcaster.begin(OPERATOR, PAYLOAD).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_stops_during_cooldown() {
        let policy = BroadcastPolicy {
            batch_size: 2,
            cooldown: Duration::from_secs(3600),
            progress_every: 50,
        };
        let h = harness(10, policy).await;
        let ticket = h.broadcaster.begin(OPERATOR, PAYLOAD).await.unwrap();
        let runner = {
            let broadcaster = h.broadcaster.clone();
            tokio::spawn(async move { broadcaster.run(ticket).await })
        };
        while h.gateway.relays().len() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(h.broadcaster.cancel().await);

        let report = runner.await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.remaining, 8);
        assert_eq!(report.delivered + report.blocked + report.failed + report.remaining, report.total);
        assert!(h.store.pending().await.unwrap().is_none());
        assert!(!h.broadcaster.cancel().await);
    }

    #[tokio::test]
    async fn resume_continues_from_checkpoint() {
        let h = harness(5, fast_policy()).await;
        let now = Utc::now();
        let checkpoint = BroadcastCheckpoint {
            id: "interrupted".into(),
            operator: OPERATOR,
            payload: PAYLOAD,
            recipients: (100..105).map(RecipientId).collect(),
            next_index: 3,
            delivered: 2,
            blocked: 1,
            failed: 0,
            started_at: now,
            updated_at: now,
        };
        h.store.save(&checkpoint).await.unwrap();

        let ticket = h.broadcaster.begin_resume(OPERATOR).await.unwrap();
        assert_eq!(ticket.remaining(), 2);
        let report = h.broadcaster.run(ticket).await;

        assert_eq!(report.id, "interrupted");
        assert_eq!((report.delivered, report.blocked, report.failed), (4, 1, 0));
        let relayed: Vec<_> = h.gateway.relays().into_iter().map(|(to, _)| to).collect();
        assert_eq!(relayed, vec![RecipientId(103), RecipientId(104)]);
        assert!(h.store.pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_broadcast_discards_interrupted_checkpoint() {
        let h = harness(3, fast_policy()).await;
        let now = Utc::now();
        let stale = BroadcastCheckpoint {
            id: "crashed".into(),
            operator: OPERATOR,
            payload: RelayPayload { from_chat: 1, message_id: 1 },
            recipients: (100..103).map(RecipientId).collect(),
            next_index: 1,
            delivered: 1,
            blocked: 0,
            failed: 0,
            started_at: now,
            updated_at: now,
        };
        h.store.save(&stale).await.unwrap();

        let fresh = RelayPayload { from_chat: 1, message_id: 2 };
        let report = h.broadcaster.broadcast(OPERATOR, fresh).await.unwrap();
        assert_eq!(report.delivered, 3);
        assert!(h.store.pending().await.unwrap().is_none());
        assert!(matches!(
            h.broadcaster.begin_resume(OPERATOR).await,
            Err(RelayError::NothingToResume)
        ));
        assert!(h.gateway.relays().iter().all(|(_, payload)| *payload == fresh));
        assert_eq!(h.gateway.relays().len(), 3);
    }

    #[tokio::test]
    async fn resume_without_checkpoint_fails() {
        let h = harness(1, fast_policy()).await;
        assert!(matches!(
            h.broadcaster.begin_resume(OPERATOR).await,
            Err(RelayError::NothingToResume)
        ));
    }

    #[tokio::test]
    async fn checkpoint_tracks_batch_boundaries() {
        let policy = BroadcastPolicy {
            batch_size: 2,
            cooldown: Duration::from_secs(3600),
            progress_every: 50,
        };
        let h = harness(5, policy).await;
        let ticket = h.broadcaster.begin(OPERATOR, PAYLOAD).await.unwrap();
        let runner = {
            let broadcaster = h.broadcaster.clone();
            tokio::spawn(async move { broadcaster.run(ticket).await })
        };
        while h.gateway.relays().len() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        // Give the loop time to persist before it parks in the cooldown.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let saved = h.store.pending().await.unwrap().unwrap();
        assert_eq!(saved.next_index, 2);
        assert_eq!(saved.delivered, 2);

        h.broadcaster.cancel().await;
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn progress_failures_do_not_affect_the_run() {
        let policy = BroadcastPolicy { batch_size: 25, cooldown: Duration::from_millis(1), progress_every: 2 };
        let h = harness(6, policy).await;
        h.gateway.set_fail_texts(true);
        let report = h.broadcaster.broadcast(OPERATOR, PAYLOAD).await.unwrap();
        assert_eq!(report.delivered, 6);
        assert!(h.gateway.texts().is_empty());
    }

    #[tokio::test]
    async fn progress_is_posted_to_the_operator() {
        let policy = BroadcastPolicy { batch_size: 25, cooldown: Duration::from_millis(1), progress_every: 2 };
        let h = harness(6, policy).await;
        h.broadcaster.broadcast(OPERATOR, PAYLOAD).await.unwrap();
        assert_eq!(h.gateway.texts_to(OPERATOR).len(), 1);
        assert!(!h.gateway.edits().is_empty());
    }

    #[test]
    fn outcome_classification() {
        assert_eq!(Outcome::classify(&Ok(())), Outcome::Delivered);
        assert_eq!(Outcome::classify(&Err(blocked())), Outcome::Blocked);
        assert_eq!(
            Outcome::classify(&Err(GatewayError::RateLimited(Duration::from_secs(3)))),
            Outcome::Failed
        );
    }
}
