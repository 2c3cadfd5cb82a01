//! Log Redaction Layer
//!
//! Scrubs Telegram bot tokens and bearer credentials from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static BOT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{5,12}:[A-Za-z0-9_-]{30,}").unwrap());
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BOT_TOKEN_RE.replace_all(input, "[REDACTED_TOKEN]");
    BEARER_RE.replace_all(&redacted, "[REDACTED_TOKEN]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_bot_token_inside_urls() {
        let raw = "POST https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawX/sendPhoto";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawX"));
        assert!(clean.contains("sendPhoto"));
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        assert_eq!(redact_sensitive_data("code a1b2c3d4e5f6"), "code a1b2c3d4e5f6");
    }
}
