use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of generated codes, in hex characters (48 bits of entropy).
pub const CODE_LEN: usize = 12;

/// Longest accepted code. Telegram allows 64 bytes of callback data and a
/// code must still fit behind an 8-byte action prefix such as `recheck:`.
pub const MAX_CODE_LEN: usize = 56;

/// Opaque, case-sensitive identifier carried by a deep link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("code is empty")]
    Empty,
    #[error("code is longer than {MAX_CODE_LEN} characters")]
    TooLong,
    #[error("code contains invalid character {0:?}")]
    InvalidChar(char),
}

impl Code {
    /// Draw a fresh random code.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..CODE_LEN].to_string())
    }

    /// Validate a code taken from untrusted input.
    ///
    /// Accepts the deep-link alphabet `[A-Za-z0-9_-]`; older codes of other
    /// lengths stay valid.
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CodeError::Empty);
        }
        if raw.len() > MAX_CODE_LEN {
            return Err(CodeError::TooLong);
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(CodeError::InvalidChar(bad));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
