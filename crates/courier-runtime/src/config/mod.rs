//! Configuration for the Courier runtime.
//!
//! Settings are layered by figment from serde defaults, an optional
//! `courier.toml`, `COURIER_*` environment variables and programmatic
//! overrides, then checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, CourierConfig, DispatchConfig, LogFormat, LogLevel, LoggingConfig, WebhookConfig,
};
pub use validation::{validate_config, validate_serving};
