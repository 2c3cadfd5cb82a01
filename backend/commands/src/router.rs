/// Inbound routing: one entry point for every update the transport sees.
///
/// Text goes through command detection, uploads into the registry, and
/// gate callbacks back into the resolver. Every path ends in a
/// `CommandResponse`; nothing here fails the update.
use std::sync::Arc;
use tracing::{debug, warn};

use linkdrop_core::{ContentDraft, RecipientId, RelayPayload};
use linkdrop_relay::{LinkBuilder, LinkResolver, RecipientDirectory, Registry};

use crate::detection::{detect_command, looks_like_command};
use crate::dispatch::{CommandContext, CommandDispatcher, CommandResponse};
use crate::format::{self, RECHECK_PREFIX};

/// What the sender did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Upload(ContentDraft),
    /// Inline button press carrying callback data.
    Callback(String),
    /// Anything the relay has no use for (locations, polls, …).
    Other,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub sender: RecipientId,
    pub display_name: String,
    pub username: Option<String>,
    /// Message the inbound one replied to.
    pub reply_to: Option<RelayPayload>,
    pub inbound: Inbound,
}

impl Envelope {
    pub fn new(sender: RecipientId, display_name: impl Into<String>, inbound: Inbound) -> Self {
        Self { sender, display_name: display_name.into(), username: None, reply_to: None, inbound }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn replying_to(mut self, payload: Option<RelayPayload>) -> Self {
        self.reply_to = payload;
        self
    }
}

pub struct RelayRouter {
    operator: RecipientId,
    dispatcher: CommandDispatcher,
    registry: Arc<Registry>,
    directory: Arc<RecipientDirectory>,
    resolver: Arc<LinkResolver>,
    links: LinkBuilder,
}

impl RelayRouter {
    pub fn new(
        operator: RecipientId,
        dispatcher: CommandDispatcher,
        registry: Arc<Registry>,
        directory: Arc<RecipientDirectory>,
        resolver: Arc<LinkResolver>,
        links: LinkBuilder,
    ) -> Self {
        Self { operator, dispatcher, registry, directory, resolver, links }
    }

    pub fn operator(&self) -> RecipientId {
        self.operator
    }

    pub async fn handle(&self, envelope: Envelope) -> CommandResponse {
        if let Err(e) = self
            .directory
            .touch(envelope.sender, &envelope.display_name, envelope.username.as_deref())
            .await
        {
            warn!(sender = %envelope.sender, error = %e, "Could not record recipient");
        }

        let ctx = CommandContext {
            sender: envelope.sender,
            is_operator: envelope.sender == self.operator,
            reply_to: envelope.reply_to,
        };

        match envelope.inbound {
            Inbound::Text(text) => self.on_text(&ctx, &text).await,
            Inbound::Upload(draft) => self.on_upload(&ctx, draft).await,
            Inbound::Callback(data) => self.on_callback(&ctx, &data).await,
            Inbound::Other => CommandResponse::text(format::fallback_hint(ctx.is_operator)),
        }
    }

    async fn on_text(&self, ctx: &CommandContext, text: &str) -> CommandResponse {
        if let Some(inv) = detect_command(text, self.dispatcher.registry()) {
            return self.dispatcher.dispatch(ctx, &inv).await;
        }
        if looks_like_command(text) {
            return CommandResponse::text("❓ Unknown command. Send /help for the list.");
        }
        CommandResponse::text(format::fallback_hint(ctx.is_operator))
    }

    async fn on_upload(&self, ctx: &CommandContext, draft: ContentDraft) -> CommandResponse {
        if !ctx.is_operator {
            debug!(sender = %ctx.sender, "Refused upload from non-operator");
            return CommandResponse::text(format::upload_refused());
        }
        match self.registry.create(draft).await {
            Ok(reference) => CommandResponse::text(format::upload_reply(&reference, &self.links)),
            Err(err) => {
                warn!(error = %err, "Upload could not be stored");
                CommandResponse::text(format::error_reply(&err))
            }
        }
    }

    async fn on_callback(&self, ctx: &CommandContext, data: &str) -> CommandResponse {
        let Some(code) = data.strip_prefix(RECHECK_PREFIX) else {
            debug!(data, "Ignoring unknown callback");
            return CommandResponse::none();
        };
        match self.resolver.resolve(ctx.sender, code).await {
            Ok(resolution) => format::resolution_reply(&resolution)
                .map(CommandResponse::message)
                .unwrap_or_else(CommandResponse::none),
            Err(err) => {
                warn!(error = %err, "Recheck failed");
                CommandResponse::text(format::error_reply(&err))
            }
        }
    }
}
