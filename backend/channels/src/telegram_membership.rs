//! Gate membership lookups through `getChatMember`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::debug;

use linkdrop_core::{MembershipOracle, RecipientId};

/// Parse a gate target: `@channel` or a numeric chat id.
pub fn parse_target(target: &str) -> Result<Recipient> {
    let target = target.trim();
    if target.len() > 1 && target.starts_with('@') {
        return Ok(Recipient::ChannelUsername(target.to_string()));
    }
    match target.parse::<i64>() {
        Ok(id) => Ok(Recipient::Id(ChatId(id))),
        Err(_) => bail!("gate target {target:?} is neither @username nor a chat id"),
    }
}

pub struct TelegramMembership {
    bot: Bot,
}

impl TelegramMembership {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MembershipOracle for TelegramMembership {
    async fn is_member(&self, recipient: RecipientId, target: &str) -> Result<bool> {
        let chat = parse_target(target)?;
        let user = UserId(u64::try_from(recipient.0).context("recipient is not a user id")?);
        let member = self
            .bot
            .get_chat_member(chat, user)
            .await
            .with_context(|| format!("getChatMember {target} for {recipient}"))?;
        let present = member.kind.is_present();
        debug!(%recipient, target, present, "Membership checked");
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_and_ids_parse() {
        assert_eq!(
            parse_target("@news").unwrap(),
            Recipient::ChannelUsername("@news".into())
        );
        assert_eq!(
            parse_target("-1001234567890").unwrap(),
            Recipient::Id(ChatId(-1001234567890))
        );
    }

    #[test]
    fn garbage_targets_are_rejected() {
        assert!(parse_target("@").is_err());
        assert!(parse_target("news").is_err());
    }
}
