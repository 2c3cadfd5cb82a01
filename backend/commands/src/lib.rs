pub mod detection;
pub mod dispatch;
pub mod format;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod types;

pub use detection::{detect_command, looks_like_command};
pub use dispatch::{CommandContext, CommandDispatcher, CommandHandler, CommandResponse};
pub use handlers::{
    BroadcastHandler, CancelHandler, DeleteHandler, GateHandler, HelpHandler, ListHandler,
    ResumeHandler, StartHandler, StatsHandler,
};
pub use registry::{builtin_commands, CommandRegistry};
pub use router::{Envelope, Inbound, RelayRouter};
pub use types::{CommandArg, CommandCategory, CommandDef, CommandInvocation, CommandScope};

use std::sync::Arc;

use linkdrop_core::{MessagingGateway, RecipientId};
use linkdrop_relay::{AccessGate, Broadcaster, LinkBuilder, LinkResolver, RecipientDirectory, Registry};

/// Everything the command surface talks to.
#[derive(Clone)]
pub struct RelayServices {
    pub operator: RecipientId,
    pub registry: Arc<Registry>,
    pub directory: Arc<RecipientDirectory>,
    pub gate: Arc<AccessGate>,
    pub resolver: Arc<LinkResolver>,
    pub broadcaster: Arc<Broadcaster>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub links: LinkBuilder,
    pub page_budget: usize,
}

/// Build a dispatcher pre-wired with all built-in handlers.
pub fn build_default_dispatcher(services: &RelayServices) -> CommandDispatcher {
    let registry = Arc::new(CommandRegistry::new());
    let mut dispatcher = CommandDispatcher::new(registry.clone());

    dispatcher.register(
        "start",
        Arc::new(StartHandler {
            resolver: services.resolver.clone(),
            registry: services.registry.clone(),
        }),
    );
    dispatcher.register("help", Arc::new(HelpHandler { registry }));
    dispatcher.register(
        "list",
        Arc::new(ListHandler {
            registry: services.registry.clone(),
            links: services.links.clone(),
            page_budget: services.page_budget,
        }),
    );
    dispatcher.register("del", Arc::new(DeleteHandler { registry: services.registry.clone() }));
    dispatcher.register("stats", Arc::new(StatsHandler { registry: services.registry.clone() }));
    dispatcher.register("gate", Arc::new(GateHandler { gate: services.gate.clone() }));
    dispatcher.register(
        "broadcast",
        Arc::new(BroadcastHandler {
            broadcaster: services.broadcaster.clone(),
            gateway: services.gateway.clone(),
        }),
    );
    dispatcher.register("cancel", Arc::new(CancelHandler { broadcaster: services.broadcaster.clone() }));
    dispatcher.register(
        "resume",
        Arc::new(ResumeHandler {
            broadcaster: services.broadcaster.clone(),
            gateway: services.gateway.clone(),
        }),
    );

    dispatcher
}

/// Build the inbound router over `services`.
pub fn build_router(services: RelayServices) -> RelayRouter {
    let dispatcher = build_default_dispatcher(&services);
    RelayRouter::new(
        services.operator,
        dispatcher,
        services.registry,
        services.directory,
        services.resolver,
        services.links,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use linkdrop_core::testkit::{RecordingGateway, ScriptedOracle};
    use linkdrop_core::{Button, ContentDraft, ContentKind, GatewayError, RelayPayload};
    use linkdrop_relay::BroadcastPolicy;
    use linkdrop_store::InMemoryStore;

    const OPERATOR: RecipientId = RecipientId(1);
    const USER: RecipientId = RecipientId(42);

    struct Harness {
        router: RelayRouter,
        services: RelayServices,
        gateway: Arc<RecordingGateway>,
        oracle: Arc<ScriptedOracle>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let oracle = Arc::new(ScriptedOracle::new());
        let registry = Arc::new(Registry::new(store.clone()));
        let directory = Arc::new(RecipientDirectory::new(store.clone()));
        let gate = Arc::new(AccessGate::new(oracle.clone(), OPERATOR, Some("@news".into())));
        let resolver = Arc::new(LinkResolver::new(registry.clone(), gate.clone(), gateway.clone()));
        let policy = BroadcastPolicy { cooldown: Duration::from_millis(1), ..Default::default() };
        let broadcaster =
            Arc::new(Broadcaster::new(directory.clone(), gateway.clone(), store.clone(), policy));
        let services = RelayServices {
            operator: OPERATOR,
            registry,
            directory,
            gate,
            resolver,
            broadcaster,
            gateway: gateway.clone(),
            links: LinkBuilder::for_bot("drop_bot"),
            page_budget: 4000,
        };
        Harness { router: build_router(services.clone()), services, gateway, oracle }
    }

    fn text(sender: RecipientId, text: &str) -> Envelope {
        Envelope::new(sender, "Tester", Inbound::Text(text.into()))
    }

    async fn upload(h: &Harness, draft: ContentDraft) -> String {
        let response = h.router.handle(Envelope::new(OPERATOR, "Owner", Inbound::Upload(draft))).await;
        let reply = response.first_text().unwrap().to_string();
        let start = reply.find("?start=").unwrap() + "?start=".len();
        reply[start..].split('<').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn operator_upload_then_recipient_download() {
        let h = harness();
        let code = upload(&h, ContentDraft::new(ContentKind::Photo, "X1")).await;

        let response = h.router.handle(text(USER, &format!("/start {code}"))).await;
        assert!(response.is_empty());
        let deliveries = h.gateway.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!((deliveries[0].recipient, deliveries[0].external_id.as_str()), (USER, "X1"));
    }

    #[tokio::test]
    async fn non_operator_upload_is_refused() {
        let h = harness();
        let draft = ContentDraft::new(ContentKind::Document, "BQAC");
        let response = h.router.handle(Envelope::new(USER, "Guest", Inbound::Upload(draft))).await;
        assert!(response.first_text().unwrap().contains("Only the owner"));
        assert!(h.services.registry.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn every_update_touches_the_directory() {
        let h = harness();
        h.router.handle(text(USER, "hello")).await;
        h.router.handle(Envelope::new(RecipientId(7), "Other", Inbound::Other)).await;
        assert_eq!(h.services.directory.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn operator_commands_are_refused_to_recipients() {
        let h = harness();
        for command in ["/list", "/stats", "/del abc", "/gate", "/broadcast", "/cancel", "/resume"] {
            let response = h.router.handle(text(USER, command)).await;
            assert!(response.first_text().unwrap().contains("only available to the owner"), "{command}");
        }
        assert!(!h.services.gate.is_required());
    }

    #[tokio::test]
    async fn greeting_depends_on_sender() {
        let h = harness();
        upload(&h, ContentDraft::new(ContentKind::Audio, "A1")).await;
        let owner = h.router.handle(text(OPERATOR, "/start")).await;
        assert!(owner.first_text().unwrap().contains("Files stored: <b>1</b>"));
        let guest = h.router.handle(text(USER, "/start")).await;
        assert!(guest.first_text().unwrap().contains("Open a link"));
    }

    #[tokio::test]
    async fn gate_challenge_and_recheck() {
        let h = harness();
        let code = upload(&h, ContentDraft::new(ContentKind::Video, "V1")).await;
        h.router.handle(text(OPERATOR, "/gate on")).await;

        let denied = h.router.handle(text(USER, &format!("/start {code}"))).await;
        let challenge = &denied.messages[0];
        let recheck = challenge
            .buttons
            .iter()
            .find_map(|b| match b {
                Button::Callback { data, .. } => Some(data.clone()),
                _ => None,
            })
            .unwrap();
        assert!(h.gateway.deliveries().is_empty());

        let still_denied = h
            .router
            .handle(Envelope::new(USER, "Tester", Inbound::Callback(recheck.clone())))
            .await;
        assert!(!still_denied.is_empty());

        h.oracle.admit(USER);
        let admitted = h
            .router
            .handle(Envelope::new(USER, "Tester", Inbound::Callback(recheck)))
            .await;
        assert!(admitted.is_empty());
        assert_eq!(h.gateway.deliveries().len(), 1);
        assert_eq!(h.services.registry.list_all().await.unwrap()[0].download_count, 1);
    }

    #[tokio::test]
    async fn unknown_code_gets_not_found_text() {
        let h = harness();
        let response = h.router.handle(text(USER, "/start 000000000000")).await;
        assert!(response.first_text().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn list_paginates_and_delete_removes() {
        let h = harness();
        let mut codes = Vec::new();
        for i in 0..3 {
            let draft = ContentDraft::new(ContentKind::Document, format!("D{i}"))
                .with_display_name(format!("doc{i}.pdf"));
            codes.push(upload(&h, draft).await);
        }
        let list = h.router.handle(text(OPERATOR, "/list")).await;
        assert_eq!(list.messages.len(), 1);
        assert!(list.first_text().unwrap().contains("doc2.pdf"));

        let deleted = h.router.handle(text(OPERATOR, &format!("/del {}", codes[0]))).await;
        assert!(deleted.first_text().unwrap().contains("doc0.pdf"));
        let again = h.router.handle(text(OPERATOR, &format!("/del {}", codes[0]))).await;
        assert!(again.first_text().unwrap().contains("not found"));
        let usage = h.router.handle(text(OPERATOR, "/del")).await;
        assert!(usage.first_text().unwrap().starts_with("Usage"));
    }

    #[tokio::test]
    async fn stats_reports_totals() {
        let h = harness();
        let code = upload(&h, ContentDraft::new(ContentKind::Photo, "X1")).await;
        h.router.handle(text(USER, &format!("/start {code}"))).await;
        let stats = h.router.handle(text(OPERATOR, "/stats@drop_bot")).await;
        assert!(stats.first_text().unwrap().contains("Total downloads: <b>1</b>"));
    }

    #[tokio::test]
    async fn broadcast_requires_a_reply_and_reports_back() {
        let h = harness();
        for id in 100..110 {
            h.router.handle(text(RecipientId(id), "hi")).await;
        }
        h.gateway.fail_relay_to(
            RecipientId(105),
            GatewayError::from_description("Forbidden: bot was blocked by the user"),
        );

        let missing = h.router.handle(text(OPERATOR, "/broadcast")).await;
        assert!(missing.first_text().unwrap().contains("Reply to the message"));

        let payload = RelayPayload { from_chat: OPERATOR.0, message_id: 77 };
        let started = h
            .router
            .handle(text(OPERATOR, "/broadcast").replying_to(Some(payload)))
            .await;
        // Ten users plus the operator, who was recorded by the first /broadcast.
        assert!(started.first_text().unwrap().contains("<b>11</b>"));

        let report = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(text) = h
                    .gateway
                    .texts_to(OPERATOR)
                    .into_iter()
                    .find(|t| t.contains("Broadcast finished"))
                {
                    return text;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(report.contains("Delivered: 10"));
        assert!(report.contains("Blocked: 1"));
    }

    #[tokio::test]
    async fn cancel_and_resume_without_broadcast() {
        let h = harness();
        let cancel = h.router.handle(text(OPERATOR, "/cancel")).await;
        assert!(cancel.first_text().unwrap().contains("No broadcast"));
        let resume = h.router.handle(text(OPERATOR, "/resume")).await;
        assert!(resume.first_text().unwrap().contains("no interrupted broadcast"));
    }

    #[tokio::test]
    async fn help_lists_only_visible_commands() {
        let h = harness();
        let guest = h.router.handle(text(USER, "/help")).await;
        assert!(!guest.first_text().unwrap().contains("/broadcast"));
        let owner = h.router.handle(text(OPERATOR, "/help")).await;
        assert!(owner.first_text().unwrap().contains("/broadcast"));
        assert!(owner.first_text().unwrap().contains("/del &lt;code&gt;"));
    }

    #[tokio::test]
    async fn unknown_command_and_plain_text() {
        let h = harness();
        let unknown = h.router.handle(text(USER, "/frobnicate")).await;
        assert!(unknown.first_text().unwrap().contains("Unknown command"));
        let plain = h.router.handle(text(OPERATOR, "hello")).await;
        assert!(plain.first_text().unwrap().contains("Send a file"));
    }
}
