//! Config validation: one pass collecting every error and warning.

use crate::schema::{RelayConfig, TransportMode};
use thiserror::Error;

/// Telegram rejects messages longer than this.
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &RelayConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_telegram(config, &mut report);
    validate_operator(config, &mut report);
    validate_gate(config, &mut report);
    validate_broadcast(config, &mut report);
    validate_listing(config, &mut report);
    validate_server(config, &mut report);
    report
}

fn validate_telegram(config: &RelayConfig, report: &mut ValidationReport) {
    if config.bot_token().is_none() {
        report.error("telegram.botToken", "Telegram bot token is required (or set BOT_TOKEN)");
    }
    if config.bot_username().is_none() {
        report.error(
            "telegram.botUsername",
            "Bot username is required to build deep links (or set BOT_USERNAME)",
        );
    }
    if config.mode() == TransportMode::Webhook {
        match config.webhook_url() {
            None => report.error("telegram.webhookUrl", "Webhook mode needs a public webhookUrl"),
            Some(url) if !url.starts_with("https://") => {
                report.error("telegram.webhookUrl", "Telegram only delivers webhooks over https")
            }
            Some(_) => {}
        }
    }
}

fn validate_operator(config: &RelayConfig, report: &mut ValidationReport) {
    match config.operator_id() {
        None => report.error("operator.id", "Operator user id is required (or set OWNER_ID)"),
        Some(id) if id <= 0 => report.error("operator.id", "Operator id must be a user id (> 0)"),
        Some(_) => {}
    }
}

fn validate_gate(config: &RelayConfig, report: &mut ValidationReport) {
    if config.gate_enabled() && config.gate_target().is_none() {
        report.warn("gate.target", "Gate is enabled without a target; every recipient will be allowed");
    }
    if let Some(target) = config.gate_target() {
        let numeric = target.parse::<i64>().is_ok();
        if !numeric && !target.starts_with('@') {
            report.error("gate.target", format!("Gate target '{target}' must be @channel or a chat id"));
        }
    }
    if config.oracle_timeout().is_zero() {
        report.error("gate.oracleTimeoutSecs", "oracleTimeoutSecs must be >= 1");
    }
}

fn validate_broadcast(config: &RelayConfig, report: &mut ValidationReport) {
    if config.batch_size() == 0 {
        report.error("broadcast.batchSize", "batchSize must be >= 1");
    }
    if config.progress_every() == 0 {
        report.error("broadcast.progressEvery", "progressEvery must be >= 1");
    }
    if config.cooldown().is_zero() {
        report.warn("broadcast.cooldownMs", "A zero cooldown will hit Telegram flood limits on large broadcasts");
    }
}

fn validate_listing(config: &RelayConfig, report: &mut ValidationReport) {
    let budget = config.page_budget();
    if budget < 200 || budget > TELEGRAM_MESSAGE_LIMIT {
        report.error(
            "listing.pageBudget",
            format!("pageBudget must be between 200 and {TELEGRAM_MESSAGE_LIMIT}"),
        );
    }
}

fn validate_server(config: &RelayConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if let Some(port) = server.port {
        if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "server.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
}
