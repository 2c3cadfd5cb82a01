use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{Chat, User};
use teloxide::update_listeners::webhooks;
use tracing::{debug, info, warn};

use linkdrop_commands::{CommandResponse, Envelope, Inbound, RelayRouter};
use linkdrop_core::{MessagingGateway, RecipientId, RelayPayload};

use crate::telegram_media::draft_from_message;
use crate::{ChannelAdapter, ChannelHandle};

/// How updates reach the bot.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Long polling `getUpdates`.
    Polling,
    /// Telegram pushes to `url`; the HTTP server binds `address`.
    Webhook { url: reqwest::Url, address: SocketAddr },
}

/// Shared state injected into every endpoint.
struct Relay {
    router: Arc<RelayRouter>,
    gateway: Arc<dyn MessagingGateway>,
}

impl Relay {
    async fn reply(&self, to: RecipientId, response: CommandResponse) {
        for message in &response.messages {
            if let Err(e) = self.gateway.send_text(to, message).await {
                warn!(recipient = %to, error = %e, "Could not send reply");
            }
        }
    }
}

fn chat_display_name(chat: &Chat) -> String {
    let name = [chat.first_name(), chat.last_name()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() { "user".to_string() } else { name }
}

fn user_display_name(user: &User) -> String {
    match &user.last_name {
        Some(last) => format!("{} {last}", user.first_name),
        None => user.first_name.clone(),
    }
}

async fn on_message(msg: Message, relay: Arc<Relay>) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        debug!(chat = %msg.chat.id, "Ignoring non-private chat");
        return respond(());
    }

    let sender = RecipientId(msg.chat.id.0);
    let inbound = if let Some(draft) = draft_from_message(&msg) {
        Inbound::Upload(draft)
    } else if let Some(text) = msg.text() {
        Inbound::Text(text.to_string())
    } else {
        Inbound::Other
    };
    let reply_to = msg.reply_to_message().map(|replied| RelayPayload {
        from_chat: replied.chat.id.0,
        message_id: replied.id.0,
    });

    let envelope = Envelope::new(sender, chat_display_name(&msg.chat), inbound)
        .with_username(msg.chat.username().map(str::to_string))
        .replying_to(reply_to);
    let response = relay.router.handle(envelope).await;
    relay.reply(sender, response).await;
    respond(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, relay: Arc<Relay>) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        debug!(error = %e, "Could not answer callback query");
    }
    let Some(data) = query.data.clone() else {
        return respond(());
    };

    // Private chat id equals the user id.
    let sender = RecipientId(query.from.id.0 as i64);
    let envelope = Envelope::new(sender, user_display_name(&query.from), Inbound::Callback(data))
        .with_username(query.from.username.clone());
    let response = relay.router.handle(envelope).await;
    relay.reply(sender, response).await;
    respond(())
}

pub struct TelegramAdapter {
    bot: Bot,
    relay: Arc<Relay>,
    transport: Transport,
}

impl TelegramAdapter {
    pub fn new(
        bot: Bot,
        router: Arc<RelayRouter>,
        gateway: Arc<dyn MessagingGateway>,
        transport: Transport,
    ) -> Self {
        Self { bot, relay: Arc::new(Relay { router, gateway }), transport }
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str { "telegram" }

    async fn start(&self) -> anyhow::Result<ChannelHandle> {
        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(on_message))
            .branch(Update::filter_callback_query().endpoint(on_callback));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.relay.clone()])
            .default_handler(|update| async move {
                debug!(id = ?update.id, "Unhandled update");
            })
            .enable_ctrlc_handler()
            .build();

        match &self.transport {
            Transport::Polling => {
                info!("Starting Telegram adapter (long polling)");
                let task = tokio::spawn(async move {
                    dispatcher.dispatch().await;
                });
                Ok(ChannelHandle { router: axum::Router::new(), task })
            }
            Transport::Webhook { url, address } => {
                info!(address = %address, "Starting Telegram adapter (webhook)");
                let options = webhooks::Options::new(*address, url.clone());
                let (listener, _stop, router) =
                    webhooks::axum_to_router(self.bot.clone(), options).await?;
                let task = tokio::spawn(async move {
                    dispatcher
                        .dispatch_with_listener(
                            listener,
                            LoggingErrorHandler::with_custom_text("Webhook listener error"),
                        )
                        .await;
                });
                Ok(ChannelHandle { router, task })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_names_join_first_and_last() {
        let chat: Chat = serde_json::from_value(json!({
            "id": 42, "type": "private", "first_name": "Ada", "last_name": "Lovelace"
        }))
        .unwrap();
        assert_eq!(chat_display_name(&chat), "Ada Lovelace");

        let user: User = serde_json::from_value(json!({
            "id": 42, "is_bot": false, "first_name": "Ada"
        }))
        .unwrap();
        assert_eq!(user_display_name(&user), "Ada");
    }
}
