use linkdrop_core::Code;

/// Builds `<entrypoint>?start=<code>` deep links.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    entrypoint: String,
}

impl LinkBuilder {
    pub fn new(entrypoint: impl Into<String>) -> Self {
        let entrypoint = entrypoint.into();
        Self { entrypoint: entrypoint.trim_end_matches('/').to_string() }
    }

    /// Entrypoint for a Telegram bot, `@` prefix optional.
    pub fn for_bot(username: &str) -> Self {
        Self::new(format!("https://t.me/{}", username.trim_start_matches('@')))
    }

    pub fn link(&self, code: &Code) -> String {
        format!("{}?start={}", self.entrypoint, code)
    }
}
