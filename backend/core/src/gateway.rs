//! Messaging gateway seam.
//!
//! The relay never talks to Telegram directly; it hands delivery and relay
//! instructions to a [`MessagingGateway`] and classifies what comes back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::{ContentKind, ContentReference};
use crate::recipient::RecipientId;

/// Instruction to re-materialize one stored item in a recipient's chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: RecipientId,
    pub kind: ContentKind,
    pub external_id: String,
    pub caption: Option<String>,
}

impl Delivery {
    /// Build the delivery for `reference`, applying the caption rule.
    pub fn of(recipient: RecipientId, reference: &ContentReference) -> Self {
        Self {
            recipient,
            kind: reference.kind,
            external_id: reference.external_id.clone(),
            caption: reference.delivery_caption().map(str::to_string),
        }
    }
}

/// Opaque pointer to an existing message that the gateway copies as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub from_chat: i64,
    pub message_id: i32,
}

/// Handle to a text message the gateway already sent, for later edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: RecipientId,
    pub message_id: i32,
}

/// Inline keyboard button attached to an outbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    Callback { label: String, data: String },
    Url { label: String, url: String },
}

/// A text reply, HTML formatted, with an optional single-column keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundText {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl OutboundText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), buttons: Vec::new() }
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }
}

/// Gateway failure, classified enough to tell blocked recipients apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("recipient unreachable: {0}")]
    Blocked(String),

    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("gateway error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Classify a free-form failure description.
    pub fn from_description(description: impl Into<String>) -> Self {
        let description = description.into();
        let lower = description.to_lowercase();
        let blocked = ["blocked by the user", "user is deactivated", "bot was kicked"]
            .iter()
            .any(|needle| lower.contains(needle));
        if blocked {
            GatewayError::Blocked(description)
        } else {
            GatewayError::Other(description)
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, GatewayError::Blocked(_))
    }
}

/// Outbound side of the messaging transport.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Content kinds this gateway can deliver.
    fn supported_kinds(&self) -> &[ContentKind] {
        &ContentKind::ALL
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), GatewayError>;

    async fn relay(&self, to: RecipientId, payload: &RelayPayload) -> Result<(), GatewayError>;

    async fn send_text(
        &self,
        to: RecipientId,
        message: &OutboundText,
    ) -> Result<SentMessage, GatewayError>;

    async fn edit_text(&self, sent: &SentMessage, text: &str) -> Result<(), GatewayError>;
}
