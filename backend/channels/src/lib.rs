//! `linkdrop-channels`: the messaging transport behind the relay.
//!
//! The Telegram adapter turns updates into router envelopes and sends the
//! router's replies back; [`TelegramGateway`] is the outbound half handed to
//! the relay services.

use async_trait::async_trait;
use tokio::task::JoinHandle;

pub mod telegram;
pub mod telegram_gateway;
pub mod telegram_media;
pub mod telegram_membership;

pub use telegram::{TelegramAdapter, Transport};
pub use telegram_gateway::{classify_request_error, TelegramGateway};
pub use telegram_media::draft_from_message;
pub use telegram_membership::{parse_target, TelegramMembership};

/// A started adapter: inbound routes to mount, and the task consuming updates.
pub struct ChannelHandle {
    /// Webhook routes to merge into the HTTP server. Empty for polling.
    pub router: axum::Router,
    pub task: JoinHandle<()>,
}

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Start consuming updates in the background.
    async fn start(&self) -> anyhow::Result<ChannelHandle>;
}
