//! Deployment environment overrides.
//!
//! Hosted deployments configure the bot purely through environment
//! variables; any of these that is set and non-empty wins over the file.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::debug;

use crate::schema::{
    GateConfig, OperatorConfig, RelayConfig, ServerConfig, StorageConfig, TelegramConfig,
    TransportMode,
};

pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
pub const ENV_OWNER_ID: &str = "OWNER_ID";
pub const ENV_BOT_USERNAME: &str = "BOT_USERNAME";
/// Public URL of the deployment; setting it switches to webhook mode.
pub const ENV_EXTERNAL_URL: &str = "RENDER_EXTERNAL_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DB_PATH: &str = "LINKDROP_DB";
pub const ENV_GATE_CHANNEL: &str = "GATE_CHANNEL";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: RelayConfig) -> Result<RelayConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

pub fn apply_env_overrides_with(
    mut config: RelayConfig,
    env: &HashMap<String, String>,
) -> Result<RelayConfig> {
    let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(token) = get(ENV_BOT_TOKEN) {
        telegram(&mut config).bot_token = Some(token.to_string());
        debug!(var = ENV_BOT_TOKEN, "Config override from environment");
    }
    if let Some(username) = get(ENV_BOT_USERNAME) {
        telegram(&mut config).bot_username = Some(username.to_string());
    }
    if let Some(url) = get(ENV_EXTERNAL_URL) {
        let telegram = telegram(&mut config);
        telegram.webhook_url = Some(url.to_string());
        telegram.mode = Some(TransportMode::Webhook);
        debug!(var = ENV_EXTERNAL_URL, "Webhook mode selected from environment");
    }
    if let Some(raw) = get(ENV_OWNER_ID) {
        let id: i64 = raw
            .parse()
            .with_context(|| format!("{ENV_OWNER_ID} must be a numeric Telegram user id, got {raw:?}"))?;
        config.operator.get_or_insert_with(OperatorConfig::default).id = Some(id);
    }
    if let Some(raw) = get(ENV_PORT) {
        let port: u16 = raw
            .parse()
            .with_context(|| format!("{ENV_PORT} must be a TCP port, got {raw:?}"))?;
        config.server.get_or_insert_with(ServerConfig::default).port = Some(port);
    }
    if let Some(path) = get(ENV_DB_PATH) {
        config.storage.get_or_insert_with(StorageConfig::default).db_path = Some(path.to_string());
    }
    if let Some(target) = get(ENV_GATE_CHANNEL) {
        config.gate.get_or_insert_with(GateConfig::default).target = Some(target.to_string());
    }
    Ok(config)
}

fn telegram(config: &mut RelayConfig) -> &mut TelegramConfig {
    config.telegram.get_or_insert_with(TelegramConfig::default)
}
