//! # Courier Runtime
//!
//! Everything needed to run a bot built on `courier-framework`:
//!
//! - [`config`]: figment-based configuration loading and validation
//! - [`logging`]: `tracing-subscriber` setup driven by the configuration
//! - [`pool`]: the bounded [`WorkerPool`] updates are processed on
//! - [`App`]: route registration plus the serve loop
//!
//! # Features
//!
//! - `toml-config` *(default)*: read `courier.toml`
//! - `http-client` *(default)*: [`App::run`] against the Telegram Bot API
//! - `http-server`: webhook delivery
//! - `json-log`: JSON log output

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod pool;

pub use app::App;
pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use pool::{PoolError, SaturationPolicy, WorkerPool};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for bot code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
