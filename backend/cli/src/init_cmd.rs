//! `linkdrop init`: write a starter config whose secrets come from the
//! environment.

use std::path::Path;

use anyhow::{bail, Result};

use linkdrop_config::schema::{OperatorConfig, TelegramConfig};
use linkdrop_config::{apply_all_defaults, write_config, RelayConfig};

use crate::terminal_output::note_success;

/// Defaults spelled out, with the token and username left as `${VAR}`
/// references. The operator id comes from `OWNER_ID`.
pub fn starter_config() -> RelayConfig {
    apply_all_defaults(RelayConfig {
        telegram: Some(TelegramConfig {
            bot_token: Some("${BOT_TOKEN}".into()),
            bot_username: Some("${BOT_USERNAME}".into()),
            ..Default::default()
        }),
        operator: Some(OperatorConfig::default()),
        ..Default::default()
    })
}

pub async fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }
    write_config(&starter_config(), path).await?;
    note_success(&format!("Wrote {}", path.display()));
    println!("Set BOT_TOKEN, BOT_USERNAME and OWNER_ID, then run `linkdrop check-config`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdrop_config::{collect_referenced_vars, load_config};

    #[test]
    fn starter_references_secrets_by_name() {
        let value = serde_json::to_value(starter_config()).unwrap();
        assert_eq!(collect_referenced_vars(&value), vec!["BOT_TOKEN", "BOT_USERNAME"]);
    }

    #[tokio::test]
    async fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        run(&path, false).await.unwrap();
        assert!(run(&path, false).await.is_err());
        run(&path, true).await.unwrap();

        assert!(path.with_extension("yaml.bak.1").exists());
        assert_eq!(load_config(&path).await.unwrap(), starter_config());
    }
}
