//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, CourierConfig, DispatchConfig, LogFormat, LoggingConfig};

/// Validates the entire configuration, bot credentials included.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_serving(config)
}

/// Validates everything needed to serve with a custom connector.
///
/// Bot settings are skipped; they only matter to the Telegram connector.
pub fn validate_serving(config: &CourierConfig) -> ConfigResult<()> {
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.token"));
    }

    validate_url(&bot.api_url)?;

    if bot.poll_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Poll timeout must be greater than 0",
        ));
    }

    if bot.webhook.enabled {
        validate_path(&bot.webhook.path)?;
        if bot.webhook.listen.is_empty() {
            return Err(ConfigError::missing_field("bot.webhook.listen"));
        }
        if let Some(ref url) = bot.webhook.public_url {
            validate_url(url)?;
        }
    }

    Ok(())
}

fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.pool_capacity == 0 {
        return Err(ConfigError::validation(
            "Pool capacity must be greater than 0",
        ));
    }

    if dispatch.timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "Dispatch timeout must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the json-log feature",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter module: {module:?}"
        )));
    }

    Ok(())
}

fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}

fn validate_path(path: &str) -> ConfigResult<()> {
    if !path.starts_with('/') {
        return Err(ConfigError::validation("Path must start with '/'"));
    }
    Ok(())
}
