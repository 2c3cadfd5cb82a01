//! Deep-link resolution.
//!
//! One request walks `CodeParsed → GateChecked` and ends in exactly one
//! [`Resolution`]. The download counter moves only after the gateway has
//! confirmed delivery.

use std::sync::Arc;

use tracing::{debug, warn};

use linkdrop_core::{Code, ContentKind, ContentReference, Delivery, MessagingGateway, RecipientId, RelayError};
use linkdrop_logging::{EventLogger, RelayEvent};

use crate::gate::{AccessGate, GateDecision};
use crate::registry::Registry;

/// Terminal state of one resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Delivered. `downloads` is the new counter value, `None` if the
    /// increment itself failed after delivery.
    Resolved { reference: ContentReference, downloads: Option<u64> },
    /// Gate not satisfied. Resolving `code` again later is safe.
    Denied { code: Code, target: String },
    /// Unknown or malformed code.
    NotFound { code: String },
    Unsupported { code: Code, kind: ContentKind },
    DeliveryFailed { code: Code, reason: String },
}

impl Resolution {
    pub fn outcome(&self) -> &'static str {
        match self {
            Resolution::Resolved { .. } => "resolved",
            Resolution::Denied { .. } => "denied",
            Resolution::NotFound { .. } => "not_found",
            Resolution::Unsupported { .. } => "unsupported",
            Resolution::DeliveryFailed { .. } => "delivery_failed",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

pub struct LinkResolver {
    registry: Arc<Registry>,
    gate: Arc<AccessGate>,
    gateway: Arc<dyn MessagingGateway>,
}

impl LinkResolver {
    pub fn new(registry: Arc<Registry>, gate: Arc<AccessGate>, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self { registry, gate, gateway }
    }

    /// Resolve the raw `/start` payload `raw` for `recipient`.
    ///
    /// Only storage failures while reading come back as `Err`; every other
    /// terminal state is a [`Resolution`].
    pub async fn resolve(&self, recipient: RecipientId, raw: &str) -> Result<Resolution, RelayError> {
        let resolution = self.run(recipient, raw).await?;
        let detail = match &resolution {
            Resolution::DeliveryFailed { reason, .. } => Some(reason.clone()),
            Resolution::Denied { target, .. } => Some(target.clone()),
            _ => None,
        };
        EventLogger::log_event(RelayEvent::Resolution {
            recipient: recipient.0,
            code: raw.trim().to_string(),
            outcome: resolution.outcome().to_string(),
            detail,
        });
        Ok(resolution)
    }

    async fn run(&self, recipient: RecipientId, raw: &str) -> Result<Resolution, RelayError> {
        let code = match Code::parse(raw) {
            Ok(code) => code,
            Err(e) => {
                debug!(recipient = %recipient, error = %e, "Malformed code");
                return Ok(Resolution::NotFound { code: raw.trim().to_string() });
            }
        };

        let Some(reference) = self.registry.find(&code).await? else {
            return Ok(Resolution::NotFound { code: code.to_string() });
        };

        if let GateDecision::Denied { target } = self.gate.check(recipient).await {
            return Ok(Resolution::Denied { code, target });
        }

        if !self.gateway.supported_kinds().contains(&reference.kind) {
            warn!(code = %code, kind = %reference.kind, "Stored kind has no delivery path");
            return Ok(Resolution::Unsupported { code, kind: reference.kind });
        }

        if let Err(e) = self.gateway.deliver(&Delivery::of(recipient, &reference)).await {
            warn!(code = %code, recipient = %recipient, error = %e, "Delivery failed");
            return Ok(Resolution::DeliveryFailed { code, reason: e.to_string() });
        }

        let downloads = match self.registry.record_download(&code).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(code = %code, error = %e, "Delivered but download count not recorded");
                None
            }
        };
        Ok(Resolution::Resolved { reference, downloads })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdrop_core::testkit::{RecordingGateway, ScriptedOracle};
    use linkdrop_core::ContentDraft;
    use linkdrop_store::InMemoryStore;

    const OPERATOR: RecipientId = RecipientId(1);
    const USER: RecipientId = RecipientId(42);

    struct Harness {
        registry: Arc<Registry>,
        gate: Arc<AccessGate>,
        gateway: Arc<RecordingGateway>,
        oracle: Arc<ScriptedOracle>,
        resolver: LinkResolver,
    }

    fn harness_with(gateway: RecordingGateway) -> Harness {
        let registry = Arc::new(Registry::new(Arc::new(InMemoryStore::new())));
        let oracle = Arc::new(ScriptedOracle::new());
        let gate = Arc::new(AccessGate::new(oracle.clone(), OPERATOR, Some("@news".into())));
        let gateway = Arc::new(gateway);
        let resolver = LinkResolver::new(registry.clone(), gate.clone(), gateway.clone());
        Harness { registry, gate, gateway, oracle, resolver }
    }

    fn harness() -> Harness {
        harness_with(RecordingGateway::new())
    }

    #[tokio::test]
    async fn photo_resolves_with_one_delivery_and_count_one() {
        let h = harness();
        let created = h.registry.create(ContentDraft::new(ContentKind::Photo, "X1")).await.unwrap();

        let resolution = h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert!(matches!(resolution, Resolution::Resolved { downloads: Some(1), .. }));

        let deliveries = h.gateway.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].kind, ContentKind::Photo);
        assert_eq!(deliveries[0].external_id, "X1");
        assert_eq!(deliveries[0].caption, None);
        assert_eq!(h.registry.get(&created.code).await.unwrap().download_count, 1);
    }

    #[tokio::test]
    async fn denied_then_admitted_counts_exactly_once() {
        let h = harness();
        h.gate.set_required(true);
        let created = h.registry.create(ContentDraft::new(ContentKind::Video, "V1")).await.unwrap();

        let first = h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert_eq!(
            first,
            Resolution::Denied { code: created.code.clone(), target: "@news".into() }
        );
        assert!(h.gateway.deliveries().is_empty());
        assert_eq!(h.registry.get(&created.code).await.unwrap().download_count, 0);

        h.oracle.admit(USER);
        let second = h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert!(second.is_resolved());
        assert_eq!(h.gateway.deliveries().len(), 1);
        assert_eq!(h.registry.get(&created.code).await.unwrap().download_count, 1);
    }

    #[tokio::test]
    async fn disabled_gate_skips_the_oracle() {
        let h = harness();
        let created = h.registry.create(ContentDraft::new(ContentKind::Audio, "A1")).await.unwrap();
        h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert_eq!(h.oracle.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found_and_mutates_nothing() {
        let h = harness();
        let created = h.registry.create(ContentDraft::new(ContentKind::Photo, "X1")).await.unwrap();

        let resolution = h.resolver.resolve(USER, "deadbeef0000").await.unwrap();
        assert_eq!(resolution, Resolution::NotFound { code: "deadbeef0000".into() });
        assert!(h.gateway.deliveries().is_empty());
        assert_eq!(h.registry.get(&created.code).await.unwrap().download_count, 0);
    }

    #[tokio::test]
    async fn malformed_code_is_not_found() {
        let h = harness();
        let resolution = h.resolver.resolve(USER, "no spaces allowed").await.unwrap();
        assert_eq!(resolution.outcome(), "not_found");
    }

    #[tokio::test]
    async fn caption_is_dropped_for_stickers() {
        let h = harness();
        let created = h
            .registry
            .create(ContentDraft::new(ContentKind::Sticker, "S1").with_caption("ignored"))
            .await
            .unwrap();
        h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert_eq!(h.gateway.deliveries()[0].caption, None);
    }

    #[tokio::test]
    async fn caption_is_kept_for_documents() {
        let h = harness();
        let created = h
            .registry
            .create(ContentDraft::new(ContentKind::Document, "D1").with_caption("v2"))
            .await
            .unwrap();
        h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert_eq!(h.gateway.deliveries()[0].caption.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn unsupported_kind_is_terminal() {
        let h = harness_with(RecordingGateway::with_supported(vec![ContentKind::Photo]));
        let created = h.registry.create(ContentDraft::new(ContentKind::Voice, "O1")).await.unwrap();
        let resolution = h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Unsupported { code: created.code.clone(), kind: ContentKind::Voice }
        );
        assert!(h.gateway.deliveries().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_leaves_count_untouched() {
        let h = harness();
        h.gateway.set_fail_deliveries(true);
        let created = h.registry.create(ContentDraft::new(ContentKind::Photo, "X1")).await.unwrap();
        let resolution = h.resolver.resolve(USER, created.code.as_str()).await.unwrap();
        assert_eq!(resolution.outcome(), "delivery_failed");
        assert_eq!(h.registry.get(&created.code).await.unwrap().download_count, 0);
    }
}
