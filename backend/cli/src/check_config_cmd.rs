//! `linkdrop check-config`: validate the effective configuration and print
//! it with secrets masked.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

use linkdrop_config::{
    collect_redacted_paths, collect_referenced_vars, prepare_with, redact, validate, RelayConfig,
};

use crate::terminal_output::{note_error, note_success, note_warn, render_settings};

fn summary(config: &RelayConfig) -> Vec<(&'static str, String)> {
    let or_unset = |value: Option<String>| value.unwrap_or_else(|| "(unset)".to_string());
    vec![
        ("bot", or_unset(config.bot_username().map(|u| format!("@{u}")))),
        ("operator", or_unset(config.operator_id().map(|id| id.to_string()))),
        ("mode", format!("{:?}", config.mode()).to_lowercase()),
        ("listen", config.bind_address()),
        ("database", config.db_path().display().to_string()),
        ("gate", match (config.gate_enabled(), config.gate_target()) {
            (true, Some(target)) => format!("on ({target})"),
            (true, None) => "on (no target)".to_string(),
            (false, _) => "off".to_string(),
        }),
        ("batch", format!(
            "{} every {}ms, progress every {}",
            config.batch_size(),
            config.cooldown().as_millis(),
            config.progress_every()
        )),
    ]
}

/// `${VAR}` references in the file as written, with whether each is set.
fn env_references(raw: &RelayConfig, is_set: impl Fn(&str) -> bool) -> Result<Vec<(String, bool)>> {
    let value = serde_json::to_value(raw).context("Failed to serialize config")?;
    Ok(collect_referenced_vars(&value)
        .into_iter()
        .map(|var| {
            let set = is_set(&var);
            (var, set)
        })
        .collect())
}

/// Check the file as written (`raw`) against `env`.
pub fn run(raw: &RelayConfig, env: &HashMap<String, String>, path: &Path) -> Result<()> {
    println!("\n🔍 Checking {}\n", path.display());

    let references = env_references(raw, |var| env.contains_key(var))?;
    if !references.is_empty() {
        println!("Environment references:");
        for (var, set) in &references {
            println!("  ${{{var}}}  {}", if *set { "set" } else { "MISSING" });
        }
        println!();
    }

    let config = &prepare_with(raw.clone(), env)?;
    print!("{}", render_settings(&summary(config)));
    println!();

    let report = validate(config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for err in &report.errors {
        note_error(&format!("{}: {}", err.path, err.message));
    }

    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    let redacted = serde_yaml::to_string(&redact(&value)).context("Failed to render config")?;
    println!("\nEffective config:\n{redacted}");
    let masked = collect_redacted_paths(&value);
    if !masked.is_empty() {
        println!("Masked: {}", masked.join(", "));
    }

    if !report.is_valid() {
        bail!("{} configuration error(s)", report.errors.len());
    }
    note_success("Configuration is valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_flags_missing_values() {
        let rows = summary(&RelayConfig::default());
        assert!(rows.contains(&("bot", "(unset)".to_string())));
        assert!(rows.contains(&("mode", "polling".to_string())));
        assert!(rows.contains(&("gate", "off".to_string())));
    }

    #[test]
    fn invalid_config_is_an_error() {
        assert!(run(&RelayConfig::default(), &HashMap::new(), Path::new("config.yaml")).is_err());
    }

    #[test]
    fn env_references_report_missing_variables() {
        let raw: RelayConfig = serde_yaml::from_str(
            "telegram:\n  botToken: \"${BOT_TOKEN}\"\n  botUsername: \"${BOT_USERNAME}\"\n",
        )
        .unwrap();
        let references = env_references(&raw, |var| var == "BOT_TOKEN").unwrap();
        assert_eq!(
            references,
            vec![("BOT_TOKEN".to_string(), true), ("BOT_USERNAME".to_string(), false)]
        );
    }
}
