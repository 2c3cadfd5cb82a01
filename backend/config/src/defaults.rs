//! Config defaults: fills every unset field with its runtime value.

use crate::schema::{
    BroadcastConfig, GateConfig, ListingConfig, LoggingConfig, RelayConfig, ServerConfig,
    StorageConfig, TelegramConfig, TransportMode,
};

pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_DB_PATH: &str = "linkdrop.db";

/// Recipients attempted between broadcast cooldowns.
pub const DEFAULT_BATCH_SIZE: usize = 25;

pub const DEFAULT_COOLDOWN_MS: u64 = 1_000;

pub const DEFAULT_PROGRESS_EVERY: usize = 50;

/// Stays under Telegram's 4096-character message limit.
pub const DEFAULT_PAGE_BUDGET: usize = 4_000;

pub const DEFAULT_BIND: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: RelayConfig) -> RelayConfig {
    let config = apply_telegram_defaults(config);
    let config = apply_gate_defaults(config);
    let config = apply_storage_defaults(config);
    let config = apply_broadcast_defaults(config);
    let config = apply_server_defaults(config);
    apply_logging_defaults(config)
}

fn apply_telegram_defaults(mut config: RelayConfig) -> RelayConfig {
    let telegram = config.telegram.get_or_insert_with(TelegramConfig::default);
    if telegram.mode.is_none() {
        telegram.mode = Some(TransportMode::Polling);
    }
    config
}

fn apply_gate_defaults(mut config: RelayConfig) -> RelayConfig {
    let gate = config.gate.get_or_insert_with(GateConfig::default);
    gate.enabled.get_or_insert(false);
    gate.oracle_timeout_secs.get_or_insert(DEFAULT_ORACLE_TIMEOUT_SECS);
    config
}

fn apply_storage_defaults(mut config: RelayConfig) -> RelayConfig {
    let storage = config.storage.get_or_insert_with(StorageConfig::default);
    if storage.db_path.is_none() {
        storage.db_path = Some(DEFAULT_DB_PATH.to_string());
    }
    config
}

/// Broadcast pacing and listing budget.
fn apply_broadcast_defaults(mut config: RelayConfig) -> RelayConfig {
    let broadcast = config.broadcast.get_or_insert_with(BroadcastConfig::default);
    broadcast.batch_size.get_or_insert(DEFAULT_BATCH_SIZE);
    broadcast.cooldown_ms.get_or_insert(DEFAULT_COOLDOWN_MS);
    broadcast.progress_every.get_or_insert(DEFAULT_PROGRESS_EVERY);

    let listing = config.listing.get_or_insert_with(ListingConfig::default);
    listing.page_budget.get_or_insert(DEFAULT_PAGE_BUDGET);
    config
}

fn apply_server_defaults(mut config: RelayConfig) -> RelayConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    if server.bind.is_none() {
        server.bind = Some(DEFAULT_BIND.to_string());
    }
    server.port.get_or_insert(DEFAULT_PORT);
    config
}

fn apply_logging_defaults(mut config: RelayConfig) -> RelayConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_broadcast_pacing() {
        let cfg = apply_all_defaults(RelayConfig::default());
        let broadcast = cfg.broadcast.unwrap();
        assert_eq!(broadcast.batch_size, Some(DEFAULT_BATCH_SIZE));
        assert_eq!(broadcast.cooldown_ms, Some(DEFAULT_COOLDOWN_MS));
        assert_eq!(broadcast.progress_every, Some(DEFAULT_PROGRESS_EVERY));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = RelayConfig::default();
        cfg.broadcast = Some(BroadcastConfig { batch_size: Some(5), ..Default::default() });
        cfg.server = Some(ServerConfig { port: Some(10000), ..Default::default() });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.batch_size(), 5);
        assert_eq!(cfg.bind_address(), "0.0.0.0:10000");
    }

    #[test]
    fn gate_starts_disabled() {
        let cfg = apply_all_defaults(RelayConfig::default());
        assert_eq!(cfg.gate.unwrap().enabled, Some(false));
    }
}
