//! linkdrop runtime configuration schema.
//!
//! Every field is optional on disk; `defaults::apply_all_defaults` fills the
//! gaps and the accessors below fall back to the same constants.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults::{
    DEFAULT_BATCH_SIZE, DEFAULT_BIND, DEFAULT_COOLDOWN_MS, DEFAULT_DB_PATH, DEFAULT_LOG_LEVEL,
    DEFAULT_ORACLE_TIMEOUT_SECS, DEFAULT_PAGE_BUDGET, DEFAULT_PORT, DEFAULT_PROGRESS_EVERY,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,

    /// The single trusted operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<OperatorConfig>,

    /// Membership gate in front of deep links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Broadcast pacing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<BroadcastConfig>,

    /// `/list` pagination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<ListingConfig>,

    /// Health server (and webhook listener)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Polling,
    Webhook,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Bot username used to build `https://t.me/<name>?start=<code>` links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TransportMode>,

    /// Public base URL Telegram posts updates to (webhook mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Operator / gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Telegram user id of the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Channel recipients must join: `@name` or numeric chat id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Initial state of the runtime toggle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Storage / broadcast / listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// SQLite database file; `:memory:` keeps everything in process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_every: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingConfig {
    /// Character budget of one `/list` page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_budget: Option<usize>,
}

// ---------------------------------------------------------------------------
// Server / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `linkdrop_relay=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the rolling log file; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl RelayConfig {
    pub fn bot_token(&self) -> Option<&str> {
        self.telegram.as_ref()?.bot_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn bot_username(&self) -> Option<&str> {
        self.telegram
            .as_ref()?
            .bot_username
            .as_deref()
            .map(|u| u.trim_start_matches('@'))
            .filter(|u| !u.is_empty())
    }

    pub fn mode(&self) -> TransportMode {
        self.telegram.as_ref().and_then(|t| t.mode).unwrap_or_default()
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.telegram.as_ref()?.webhook_url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn operator_id(&self) -> Option<i64> {
        self.operator.as_ref()?.id
    }

    pub fn gate_target(&self) -> Option<&str> {
        self.gate.as_ref()?.target.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn gate_enabled(&self) -> bool {
        self.gate.as_ref().and_then(|g| g.enabled).unwrap_or(false)
    }

    pub fn oracle_timeout(&self) -> Duration {
        let secs = self
            .gate
            .as_ref()
            .and_then(|g| g.oracle_timeout_secs)
            .unwrap_or(DEFAULT_ORACLE_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(
            self.storage
                .as_ref()
                .and_then(|s| s.db_path.as_deref())
                .unwrap_or(DEFAULT_DB_PATH),
        )
    }

    pub fn batch_size(&self) -> usize {
        self.broadcast.as_ref().and_then(|b| b.batch_size).unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(
            self.broadcast.as_ref().and_then(|b| b.cooldown_ms).unwrap_or(DEFAULT_COOLDOWN_MS),
        )
    }

    pub fn progress_every(&self) -> usize {
        self.broadcast
            .as_ref()
            .and_then(|b| b.progress_every)
            .unwrap_or(DEFAULT_PROGRESS_EVERY)
    }

    pub fn page_budget(&self) -> usize {
        self.listing.as_ref().and_then(|l| l.page_budget).unwrap_or(DEFAULT_PAGE_BUDGET)
    }

    pub fn bind_address(&self) -> String {
        let server = self.server.as_ref();
        let bind = server.and_then(|s| s.bind.as_deref()).unwrap_or(DEFAULT_BIND);
        let port = server.and_then(|s| s.port).unwrap_or(DEFAULT_PORT);
        format!("{bind}:{port}")
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.as_ref()?.dir.as_deref().map(PathBuf::from)
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
telegram:
  botToken: "123:abc"
  botUsername: "@drop_bot"
  mode: webhook
  webhookUrl: "https://relay.example.org"
operator:
  id: 42
gate:
  target: "@news"
  enabled: true
broadcast:
  batchSize: 10
  cooldownMs: 500
"#;
        let config: RelayConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bot_token(), Some("123:abc"));
        assert_eq!(config.bot_username(), Some("drop_bot"));
        assert_eq!(config.mode(), TransportMode::Webhook);
        assert_eq!(config.operator_id(), Some(42));
        assert!(config.gate_enabled());
        assert_eq!(config.batch_size(), 10);
        assert_eq!(config.cooldown(), Duration::from_millis(500));
        assert_eq!(config.progress_every(), DEFAULT_PROGRESS_EVERY);
    }

    #[test]
    fn accessors_fall_back_to_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.mode(), TransportMode::Polling);
        assert_eq!(config.page_budget(), DEFAULT_PAGE_BUDGET);
        assert_eq!(config.bind_address(), format!("{DEFAULT_BIND}:{DEFAULT_PORT}"));
        assert!(config.gate_target().is_none());
        assert!(!config.gate_enabled());
    }
}
