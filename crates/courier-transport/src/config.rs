//! Transport-level settings.

use std::time::Duration;

/// Everything the Telegram transport needs to connect.
#[derive(Clone)]
pub struct TelegramConfig {
    pub token: String,
    /// Base URL of the Bot API, without a trailing slash.
    pub api_url: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
    /// Log every request and response at `debug` level.
    pub debug: bool,
    /// Webhook delivery; long polling is used when `None`.
    pub webhook: Option<WebhookSettings>,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout: Duration::from_secs(60),
            debug: false,
            webhook: None,
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("poll_timeout", &self.poll_timeout)
            .field("debug", &self.debug)
            .field("webhook", &self.webhook)
            .finish()
    }
}

/// Webhook listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    /// Socket address to bind, e.g. `0.0.0.0:8080`.
    pub listen: String,
    /// Path that accepts update posts.
    pub path: String,
    /// URL registered with `setWebhook`. Registration is skipped when
    /// `None`, e.g. behind a proxy that is configured out of band.
    pub public_url: Option<String>,
}
