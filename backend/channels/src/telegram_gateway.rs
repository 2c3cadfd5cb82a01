//! Outbound Telegram calls behind the `MessagingGateway` seam.

use async_trait::async_trait;
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode,
};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use linkdrop_core::{
    Button, ContentKind, Delivery, GatewayError, MessagingGateway, OutboundText, RecipientId,
    RelayPayload, SentMessage,
};

/// Map a Bot API failure onto the relay's classification.
pub fn classify_request_error(err: RequestError) -> GatewayError {
    match err {
        RequestError::Api(ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::BotKicked) => {
            GatewayError::Blocked(err.to_string())
        }
        RequestError::RetryAfter(after) => GatewayError::RateLimited(after.duration()),
        other => GatewayError::from_description(other.to_string()),
    }
}

/// Single-column inline keyboard. URL buttons that do not parse are dropped.
fn keyboard(buttons: &[Button]) -> InlineKeyboardMarkup {
    let rows = buttons.iter().filter_map(|button| match button {
        Button::Callback { label, data } => {
            Some(vec![InlineKeyboardButton::callback(label.clone(), data.clone())])
        }
        Button::Url { label, url } => match url.parse::<reqwest::Url>() {
            Ok(url) => Some(vec![InlineKeyboardButton::url(label.clone(), url)]),
            Err(e) => {
                warn!(url = %url, error = %e, "Dropping button with invalid URL");
                None
            }
        },
    });
    InlineKeyboardMarkup::new(rows)
}

/// Send `$req`, attaching `$caption` when present.
macro_rules! with_caption {
    ($req:expr, $caption:expr) => {{
        let req = $req;
        match $caption {
            Some(caption) => req.caption(caption).await.map(drop),
            None => req.await.map(drop),
        }
    }};
}

pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn deliver(&self, delivery: &Delivery) -> Result<(), GatewayError> {
        let chat = ChatId(delivery.recipient.0);
        let file = InputFile::file_id(delivery.external_id.clone());
        let caption = delivery.caption.clone();
        debug!(recipient = %delivery.recipient, kind = %delivery.kind, "Delivering content");

        let result = match delivery.kind {
            ContentKind::Document => with_caption!(self.bot.send_document(chat, file), caption),
            ContentKind::Photo => with_caption!(self.bot.send_photo(chat, file), caption),
            ContentKind::Video => with_caption!(self.bot.send_video(chat, file), caption),
            ContentKind::Audio => with_caption!(self.bot.send_audio(chat, file), caption),
            ContentKind::Voice => with_caption!(self.bot.send_voice(chat, file), caption),
            ContentKind::Animation => with_caption!(self.bot.send_animation(chat, file), caption),
            ContentKind::VideoNote => self.bot.send_video_note(chat, file).await.map(drop),
            ContentKind::Sticker => self.bot.send_sticker(chat, file).await.map(drop),
        };
        result.map_err(classify_request_error)
    }

    async fn relay(&self, to: RecipientId, payload: &RelayPayload) -> Result<(), GatewayError> {
        self.bot
            .copy_message(ChatId(to.0), ChatId(payload.from_chat), MessageId(payload.message_id))
            .await
            .map(drop)
            .map_err(classify_request_error)
    }

    async fn send_text(
        &self,
        to: RecipientId,
        message: &OutboundText,
    ) -> Result<SentMessage, GatewayError> {
        let mut req = self
            .bot
            .send_message(ChatId(to.0), message.text.clone())
            .parse_mode(ParseMode::Html);
        if !message.buttons.is_empty() {
            req = req.reply_markup(keyboard(&message.buttons));
        }
        let sent = req.await.map_err(classify_request_error)?;
        Ok(SentMessage { chat: to, message_id: sent.id.0 })
    }

    async fn edit_text(&self, sent: &SentMessage, text: &str) -> Result<(), GatewayError> {
        self.bot
            .edit_message_text(ChatId(sent.chat.0), MessageId(sent.message_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(drop)
            .map_err(classify_request_error)
    }
}
