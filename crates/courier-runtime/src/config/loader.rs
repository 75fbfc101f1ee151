//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic base configuration ([`ConfigLoader::merge`])
//! 3. Main config file (`courier.toml`)
//! 4. Profile-specific config file (`courier.{profile}.toml`)
//! 5. Environment variables (`COURIER_*`)
//!
//! TOML files require the `toml-config` feature (on by default).
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `COURIER_` prefix with `__` as separator:
//!
//! - `COURIER_BOT__TOKEN=123:abc` → `bot.token = "123:abc"`
//! - `COURIER_DISPATCH__POOL_CAPACITY=32` → `dispatch.pool_capacity = 32`
//! - `COURIER_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/courier.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::CourierConfig;

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads `COURIER_PROFILE`, falling back to development.
    pub fn from_env() -> Self {
        std::env::var("COURIER_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory searched for `courier.toml`.
    ///
    /// Without any search path the current directory is searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching. A missing file is an
    /// error.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a configuration over the built-in defaults.
    ///
    /// Files and environment variables still override it.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<CourierConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: CourierConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            pool_capacity = config.dispatch.pool_capacity,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(CourierConfig::default()));

        let base = std::mem::take(&mut self.figment);
        figment = figment.merge(base);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with COURIER_ prefix");
            figment = figment.merge(Env::prefixed("COURIER_").split("__"));
        }

        Ok(figment)
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            std::env::current_dir().into_iter().collect()
        } else {
            self.search_paths.clone()
        }
    }

    /// Merges the first `courier.toml` found, followed by its profile
    /// variant when present.
    #[cfg(feature = "toml-config")]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        for search_path in self.resolve_search_paths() {
            let base_path = search_path.join("courier.toml");
            if !base_path.exists() {
                continue;
            }
            info!(path = %base_path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(&base_path));

            let profile_path = search_path.join(format!("courier.{}.toml", self.profile));
            if profile_path.exists() {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = figment.merge(Toml::file(&profile_path));
            }
            return figment;
        }

        warn!("No configuration file found, using defaults");
        figment
    }

    #[cfg(not(feature = "toml-config"))]
    fn load_config_files(&self, figment: Figment) -> Figment {
        trace!(
            paths = ?self.resolve_search_paths(),
            "File configuration disabled, skipping search"
        );
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<CourierConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<CourierConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    fn to_jail_error(e: ConfigError) -> figment::Error {
        figment::Error::from(e.to_string())
    }

    #[test]
    fn test_default_config() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::new().without_env().load().map_err(to_jail_error)?;
            assert_eq!(config.logging.level.as_str(), "info");
            assert_eq!(config.dispatch.pool_capacity, 10);
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("DEV"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("COURIER_BOT__TOKEN", "123:abc");
            jail.set_env("COURIER_DISPATCH__POOL_CAPACITY", "4");
            jail.set_env("COURIER_DISPATCH__SATURATION", "reject");

            let config = ConfigLoader::new().load().map_err(to_jail_error)?;
            assert_eq!(config.bot.token, "123:abc");
            assert_eq!(config.dispatch.pool_capacity, 4);
            assert_eq!(
                config.dispatch.saturation,
                crate::pool::SaturationPolicy::Reject
            );
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_file_then_env_priority() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "courier.toml",
                r#"
                [bot]
                token = "from-file"

                [dispatch]
                chain_policy = "first-handler"
                timeout_ms = 5000

                [logging]
                level = "debug"
                "#,
            )?;
            jail.set_env("COURIER_BOT__TOKEN", "from-env");

            let config = ConfigLoader::new().load().map_err(to_jail_error)?;
            assert_eq!(config.bot.token, "from-env");
            assert_eq!(
                config.dispatch.chain_policy,
                courier_framework::ChainPolicy::FirstHandler
            );
            assert_eq!(config.dispatch.timeout_ms, Some(5000));
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_overrides_base_file() {
        Jail::expect_with(|jail| {
            jail.create_file("courier.production.toml", "[dispatch]\npool_capacity = 2\n")?;
            jail.create_file(
                "courier.toml",
                "[bot]\ntoken = \"t\"\n\n[dispatch]\npool_capacity = 8\n",
            )?;

            let config = ConfigLoader::new()
                .profile("production")
                .without_env()
                .load()
                .map_err(to_jail_error)?;
            assert_eq!(config.dispatch.pool_capacity, 2);
            assert_eq!(config.bot.token, "t");
            Ok(())
        });
    }

    #[test]
    fn test_merge_is_overridden_by_env() {
        Jail::expect_with(|jail| {
            jail.set_env("COURIER_BOT__TOKEN", "from-env");
            let mut base = CourierConfig::default();
            base.bot.token = "from-code".into();
            base.dispatch.pool_capacity = 3;

            let config = ConfigLoader::new().merge(base).load().map_err(to_jail_error)?;
            assert_eq!(config.bot.token, "from-env");
            assert_eq!(config.dispatch.pool_capacity, 3);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .file("/nonexistent/courier.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("COURIER_LOGGING__LEVEL", "loud");
            let result = ConfigLoader::new().load();
            assert!(matches!(result, Err(ConfigError::ParseError(_))));
            Ok(())
        });
    }
}
