//! Runtime error types.

use thiserror::Error;

use courier_core::TransportError;
use courier_framework::RouteError;

use crate::config::ConfigError;
use crate::pool::PoolError;

/// Setup errors that stop [`App`](crate::App) before serving starts.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Route registration was inconsistent, e.g. a duplicate command.
    #[error("Route setup failed: {0}")]
    Route(#[from] RouteError),

    /// The provider connection could not be established.
    #[error("Failed to connect: {0}")]
    Transport(#[from] TransportError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
