//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use courier_framework::{ChainPolicy, SendErrorPolicy};
use courier_transport::{TelegramConfig, WebhookSettings};

use crate::pool::SaturationPolicy;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    /// Bot credentials and update delivery.
    #[serde(default)]
    pub bot: BotConfig,

    /// Worker pool and chain execution.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot credentials and update delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot API token.
    #[serde(default)]
    pub token: String,

    /// Log every API request and response at `debug` level.
    #[serde(default)]
    pub debug: bool,

    /// Base URL of the Bot API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Long-poll timeout passed to `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Webhook delivery. Long polling is used when disabled.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            debug: false,
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl BotConfig {
    /// Converts to the transport-level configuration.
    pub fn to_telegram_config(&self) -> TelegramConfig {
        TelegramConfig {
            token: self.token.clone(),
            api_url: self.api_url.clone(),
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            debug: self.debug,
            webhook: self.webhook.enabled.then(|| WebhookSettings {
                listen: self.webhook.listen.clone(),
                path: self.webhook.path.clone(),
                public_url: self.webhook.public_url.clone(),
            }),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    60
}

/// Webhook listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Address the listener binds.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path that accepts update posts.
    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Public URL registered with `setWebhook`, if any.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_listen(),
            path: default_webhook_path(),
            public_url: None,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "/".to_string()
}

// =============================================================================
// Dispatch
// =============================================================================

/// Worker pool and chain execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of updates processed concurrently.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Behavior when every worker is busy.
    #[serde(default)]
    pub saturation: SaturationPolicy,

    #[serde(default)]
    pub chain_policy: ChainPolicy,

    /// Behavior when a reply cannot be delivered.
    #[serde(default)]
    pub send_errors: SendErrorPolicy,

    /// Upper bound on one chain run, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_capacity: default_pool_capacity(),
            saturation: SaturationPolicy::default(),
            chain_policy: ChainPolicy::default(),
            send_errors: SendErrorPolicy::default(),
            timeout_ms: None,
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn default_pool_capacity() -> usize {
    10
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature).
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    /// Per-module overrides, e.g. `courier_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Include thread ids in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in log lines.
    #[serde(default)]
    pub file_location: bool,
}
