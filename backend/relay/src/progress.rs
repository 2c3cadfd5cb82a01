//! Best-effort broadcast progress in the operator's chat.
//!
//! The reporter owns a detached task fed through a bounded channel. The
//! broadcast loop only ever calls `try_send`, so a slow or failing gateway
//! on this side channel can neither block nor abort the fan-out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use linkdrop_core::{MessagingGateway, OutboundText, RecipientId, SentMessage};

const PROGRESS_QUEUE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub attempted: usize,
    pub total: usize,
    pub delivered: u64,
    pub blocked: u64,
    pub failed: u64,
}

impl ProgressSnapshot {
    pub fn render(&self) -> String {
        format!(
            "📡 Broadcasting… {}/{}\n✅ {} delivered · 🚫 {} blocked · ⚠️ {} failed",
            self.attempted, self.total, self.delivered, self.blocked, self.failed
        )
    }
}

pub struct ProgressReporter {
    tx: mpsc::Sender<ProgressSnapshot>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Start the reporter task for `operator`.
    pub fn spawn(gateway: Arc<dyn MessagingGateway>, operator: RecipientId) -> Self {
        let (tx, mut rx) = mpsc::channel::<ProgressSnapshot>(PROGRESS_QUEUE);
        let handle = tokio::spawn(async move {
            let mut status: Option<SentMessage> = None;
            while let Some(snapshot) = rx.recv().await {
                let text = snapshot.render();
                let result = if let Some(sent) = status {
                    gateway.edit_text(&sent, &text).await
                } else {
                    match gateway.send_text(operator, &OutboundText::new(text)).await {
                        Ok(sent) => {
                            status = Some(sent);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                };
                if let Err(e) = result {
                    debug!(operator = %operator, error = %e, "Progress update dropped");
                }
            }
        });
        Self { tx, handle }
    }

    /// Queue a snapshot; dropped silently when the queue is full.
    pub fn report(&self, snapshot: ProgressSnapshot) {
        if self.tx.try_send(snapshot).is_err() {
            debug!(attempted = snapshot.attempted, "Progress queue full, skipping update");
        }
    }

    /// Flush queued updates and stop the task.
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            debug!(error = %e, "Progress task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdrop_core::testkit::RecordingGateway;

    fn snapshot(attempted: usize) -> ProgressSnapshot {
        ProgressSnapshot { attempted, total: 10, delivered: attempted as u64, blocked: 0, failed: 0 }
    }

    #[tokio::test]
    async fn first_update_is_sent_then_edited() {
        let gateway = Arc::new(RecordingGateway::new());
        let reporter = ProgressReporter::spawn(gateway.clone(), RecipientId(7));
        reporter.report(snapshot(5));
        reporter.report(snapshot(10));
        reporter.finish().await;

        assert_eq!(gateway.texts_to(RecipientId(7)).len(), 1);
        let edits = gateway.edits();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].1.contains("10/10"));
    }

    #[tokio::test]
    async fn failing_gateway_is_swallowed() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.set_fail_texts(true);
        let reporter = ProgressReporter::spawn(gateway.clone(), RecipientId(7));
        reporter.report(snapshot(5));
        reporter.finish().await;
        assert!(gateway.texts().is_empty());
    }
}
