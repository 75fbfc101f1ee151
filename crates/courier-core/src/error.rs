//! Error types raised at the provider boundary.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by a [`MessageClient`](crate::MessageClient) call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The HTTP request itself failed.
    #[error("request failed: {0}")]
    Http(String),

    /// The provider answered with `ok: false`.
    #[error("api error {code}: {description}")]
    Api {
        /// Provider error code.
        code: i64,
        /// Human-readable description from the provider.
        description: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns `true` if the provider rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { code: 401, .. })
    }
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while establishing an update source.
///
/// All of these are setup errors: they abort `run()` before serving starts.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The provider rejected the bot credentials.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The webhook listener could not bind its address.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid transport configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// An API call made during setup failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for client calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for transport setup.
pub type TransportResult<T> = Result<T, TransportError>;
