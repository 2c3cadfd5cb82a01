/// Built-in command handlers.
///
/// Each handler is a concrete struct implementing `CommandHandler` over the
/// relay services it needs.
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use linkdrop_core::{Code, MessagingGateway, OutboundText, RecipientId, RelayError};
use linkdrop_relay::{AccessGate, BroadcastTicket, Broadcaster, LinkBuilder, LinkResolver, Registry};

use crate::dispatch::{CommandContext, CommandHandler, CommandResponse};
use crate::format;
use crate::registry::CommandRegistry;
use crate::types::{CommandCategory, CommandInvocation};

const TOP_N: usize = 5;

// ---------------------------------------------------------------------------
// /start [code]
// ---------------------------------------------------------------------------

pub struct StartHandler {
    pub resolver: Arc<LinkResolver>,
    pub registry: Arc<Registry>,
}

#[async_trait]
impl CommandHandler for StartHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        if let Some(payload) = inv.arg(0).filter(|p| !p.trim().is_empty()) {
            let resolution = self.resolver.resolve(ctx.sender, payload).await?;
            return Ok(format::resolution_reply(&resolution)
                .map(CommandResponse::message)
                .unwrap_or_else(CommandResponse::none));
        }

        if ctx.is_operator {
            let files = self.registry.list_all().await?.len();
            Ok(CommandResponse::text(format::operator_greeting(files)))
        } else {
            Ok(CommandResponse::text(format::recipient_greeting()))
        }
    }
}

// ---------------------------------------------------------------------------
// /help
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub registry: Arc<CommandRegistry>,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let mut lines = vec!["<b>Available commands</b>".to_string()];
        let categories = [
            CommandCategory::General,
            CommandCategory::Content,
            CommandCategory::Access,
            CommandCategory::Broadcast,
        ];
        for category in categories {
            let commands: Vec<_> = self
                .registry
                .visible_to(ctx.is_operator)
                .filter(|c| c.category == category)
                .collect();
            if commands.is_empty() {
                continue;
            }
            lines.push(format!("\n<i>{}</i>", category.title()));
            for cmd in commands {
                lines.push(format!(
                    "• {} · {}",
                    format::escape_html(&cmd.usage()),
                    cmd.description
                ));
            }
        }
        if ctx.is_operator {
            lines.push("\nSend any file to store it and get a link.".to_string());
        }
        Ok(CommandResponse::text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// /list
// ---------------------------------------------------------------------------

pub struct ListHandler {
    pub registry: Arc<Registry>,
    pub links: LinkBuilder,
    pub page_budget: usize,
}

#[async_trait]
impl CommandHandler for ListHandler {
    async fn handle(
        &self,
        _ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let references = self.registry.list_all().await?;
        if references.is_empty() {
            return Ok(CommandResponse::text("📂 Nothing stored yet."));
        }
        let entries: Vec<String> = references
            .iter()
            .map(|r| format::list_entry(r, &self.links))
            .collect();
        Ok(CommandResponse::pages(format::paginate(&entries, self.page_budget)))
    }
}

// ---------------------------------------------------------------------------
// /del <code>
// ---------------------------------------------------------------------------

pub struct DeleteHandler {
    pub registry: Arc<Registry>,
}

#[async_trait]
impl CommandHandler for DeleteHandler {
    async fn handle(
        &self,
        _ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let Some(raw) = inv.arg(0) else {
            return Ok(CommandResponse::text("Usage: /del <code>code</code>"));
        };
        let code = Code::parse(raw)?;
        let removed = self.registry.delete(&code).await?;
        Ok(CommandResponse::text(format::deleted_text(&removed)))
    }
}

// ---------------------------------------------------------------------------
// /stats
// ---------------------------------------------------------------------------

pub struct StatsHandler {
    pub registry: Arc<Registry>,
}

#[async_trait]
impl CommandHandler for StatsHandler {
    async fn handle(
        &self,
        _ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let stats = self.registry.stats(TOP_N).await?;
        Ok(CommandResponse::text(format::stats_text(&stats)))
    }
}

// ---------------------------------------------------------------------------
// /gate [on|off]
// ---------------------------------------------------------------------------

pub struct GateHandler {
    pub gate: Arc<AccessGate>,
}

#[async_trait]
impl CommandHandler for GateHandler {
    async fn handle(
        &self,
        _ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let required = match inv.arg(0).map(str::to_lowercase).as_deref() {
            None => self.gate.toggle(),
            Some("on") => {
                self.gate.set_required(true);
                true
            }
            Some("off") => {
                self.gate.set_required(false);
                false
            }
            Some(_) => return Ok(CommandResponse::text("Usage: /gate [on|off]")),
        };
        Ok(CommandResponse::text(format::gate_text(required, self.gate.target())))
    }
}

// ---------------------------------------------------------------------------
// Broadcast: /broadcast, /cancel, /resume
// ---------------------------------------------------------------------------

/// Drive `ticket` on its own task and post the final report to `operator`.
fn spawn_run(
    broadcaster: Arc<Broadcaster>,
    gateway: Arc<dyn MessagingGateway>,
    ticket: BroadcastTicket,
    operator: RecipientId,
) {
    tokio::spawn(async move {
        let report = broadcaster.run(ticket).await;
        let text = OutboundText::new(format::report_text(&report));
        if let Err(e) = gateway.send_text(operator, &text).await {
            warn!(id = %report.id, error = %e, "Could not deliver broadcast report");
        }
    });
}

pub struct BroadcastHandler {
    pub broadcaster: Arc<Broadcaster>,
    pub gateway: Arc<dyn MessagingGateway>,
}

#[async_trait]
impl CommandHandler for BroadcastHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let Some(payload) = ctx.reply_to else {
            return Ok(CommandResponse::text(
                "↩️ Reply to the message you want to send with /broadcast.",
            ));
        };
        let ticket = self.broadcaster.begin(ctx.sender, payload).await?;
        let total = ticket.total();
        info!(id = %ticket.id(), total, "Broadcast requested");
        spawn_run(self.broadcaster.clone(), self.gateway.clone(), ticket, ctx.sender);
        Ok(CommandResponse::text(format!(
            "📣 Broadcast started to <b>{total}</b> users.\n/cancel stops it."
        )))
    }
}

pub struct CancelHandler {
    pub broadcaster: Arc<Broadcaster>,
}

#[async_trait]
impl CommandHandler for CancelHandler {
    async fn handle(
        &self,
        _ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        if self.broadcaster.cancel().await {
            Ok(CommandResponse::text("🛑 Cancelling the broadcast…"))
        } else {
            Ok(CommandResponse::text("ℹ️ No broadcast is running."))
        }
    }
}

pub struct ResumeHandler {
    pub broadcaster: Arc<Broadcaster>,
    pub gateway: Arc<dyn MessagingGateway>,
}

#[async_trait]
impl CommandHandler for ResumeHandler {
    async fn handle(
        &self,
        ctx: &CommandContext,
        _inv: &CommandInvocation,
    ) -> Result<CommandResponse, RelayError> {
        let ticket = self.broadcaster.begin_resume(ctx.sender).await?;
        let (remaining, total) = (ticket.remaining(), ticket.total());
        spawn_run(self.broadcaster.clone(), self.gateway.clone(), ticket, ctx.sender);
        Ok(CommandResponse::text(format!(
            "▶️ Resuming broadcast: <b>{remaining}</b> of {total} users left."
        )))
    }
}
