/// Command dispatch: route detected commands to handlers, enforcing scope.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use linkdrop_core::{OutboundText, RecipientId, RelayError, RelayPayload};

use crate::format::error_reply;
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Context passed to every command handler.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub sender: RecipientId,
    pub is_operator: bool,
    /// The message this command replied to, if any.
    pub reply_to: Option<RelayPayload>,
}

/// Messages to send back to the invoker's chat, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResponse {
    pub messages: Vec<OutboundText>,
}

impl CommandResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { messages: vec![OutboundText::new(text)] }
    }

    pub fn message(message: OutboundText) -> Self {
        Self { messages: vec![message] }
    }

    pub fn pages(pages: impl IntoIterator<Item = String>) -> Self {
        Self { messages: pages.into_iter().map(OutboundText::new).collect() }
    }

    /// Nothing to say; the action itself was the answer.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// First message text, for tests and logs.
    pub fn first_text(&self) -> Option<&str> {
        self.messages.first().map(|m| m.text.as_str())
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry, handlers: HashMap::new() }
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run the handler for `inv`. Errors become user-facing replies here, so
    /// a failed command never escapes its inbound event.
    pub async fn dispatch(&self, ctx: &CommandContext, inv: &CommandInvocation) -> CommandResponse {
        match self.try_dispatch(ctx, inv).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_collaborator_failure() {
                    warn!(command = %inv.key, sender = %ctx.sender, error = %err, "Command failed");
                } else {
                    info!(command = %inv.key, sender = %ctx.sender, error = %err, "Command rejected");
                }
                CommandResponse::text(error_reply(&err))
            }
        }
    }

    async fn try_dispatch(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let operator_only = self
            .registry
            .find_by_key(&inv.key)
            .is_some_and(|def| def.operator_only());
        if operator_only && !ctx.is_operator {
            return Err(RelayError::Unauthorized(format!("/{} by {}", inv.key, ctx.sender)));
        }

        match self.handlers.get(&inv.key) {
            Some(handler) => {
                info!(command = %inv.key, sender = %ctx.sender, "Dispatching command");
                handler.handle(ctx, inv).await
            }
            None => Ok(CommandResponse::text(format!("❓ No handler registered for /{}", inv.key))),
        }
    }
}
