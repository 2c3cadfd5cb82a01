use anyhow::Result;
use async_trait::async_trait;

use crate::recipient::RecipientId;

/// Answers "is this recipient a member of group `target`".
///
/// Errors mean the oracle could not answer, not that the recipient is absent.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn is_member(&self, recipient: RecipientId, target: &str) -> Result<bool>;
}
