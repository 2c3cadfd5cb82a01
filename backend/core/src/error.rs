use thiserror::Error;

use crate::code::{Code, CodeError};

/// Top-level error type for relay operations.
///
/// Every variant is scoped to the inbound event that caused it. Denied,
/// unsupported and undeliverable links are resolution outcomes, not errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no content stored under code {0}")]
    NotFound(Code),

    #[error("operator-only action attempted by {0}")]
    Unauthorized(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("invalid code: {0}")]
    InvalidCode(#[from] CodeError),

    #[error("a broadcast is already running")]
    BroadcastInProgress,

    #[error("no interrupted broadcast to resume")]
    NothingToResume,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Whether the failure came from a collaborator rather than the request.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, RelayError::StorageError(_) | RelayError::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_failures_are_collaborator_failures() {
        assert!(RelayError::StorageError("disk full".into()).is_collaborator_failure());
        assert!(RelayError::Other(anyhow::anyhow!("boom")).is_collaborator_failure());
        assert!(!RelayError::BroadcastInProgress.is_collaborator_failure());
        assert!(!RelayError::NotFound(Code::parse("a1").unwrap()).is_collaborator_failure());
    }
}
