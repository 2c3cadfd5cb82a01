//! `linkdrop-config`: runtime configuration for the linkdrop relay.
//!
//! Provides:
//! - Typed config schema (Telegram, operator, gate, storage, broadcast pacing)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution and deployment environment overrides
//! - Config redaction for safe logging/display
//! - Default value application
//! - Validation report

pub mod defaults;
pub mod env;
pub mod io;
pub mod overrides;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use overrides::{apply_env_overrides, apply_env_overrides_with};
pub use redact::{collect_redacted_paths, redact};
pub use schema::{RelayConfig, TransportMode};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Substitute `${VAR}` references, apply environment overrides and
/// defaults, then log the validation report.
pub fn prepare_with(raw: RelayConfig, env: &HashMap<String, String>) -> Result<RelayConfig> {
    let value: Value =
        serde_json::to_value(&raw).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: RelayConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides_with(config, env)?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}
