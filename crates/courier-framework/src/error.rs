//! Error types for the Courier framework.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::router::Method;

/// Errors detected when a [`Router`](crate::Router) is sealed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Two routes were registered for the same method and path.
    #[error("duplicate route: {method} '{path}'")]
    Duplicate {
        /// The dispatch method of both routes.
        method: Method,
        /// The shared path.
        path: String,
    },
}

/// Every failure produced by one run of a handler chain, in chain order.
///
/// Handed to the error handler once per dispatch under
/// [`ChainPolicy::FullChain`](crate::ChainPolicy::FullChain).
#[derive(Debug)]
pub struct ChainError {
    errors: Vec<anyhow::Error>,
}

impl ChainError {
    pub(crate) fn new(errors: Vec<anyhow::Error>) -> Self {
        Self { errors }
    }

    /// Returns the collected errors.
    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ChainError {}

/// A handler chain did not finish within the configured dispatch timeout.
#[derive(Debug, Clone, Copy, Error)]
#[error("dispatch timed out after {0:?}")]
pub struct DispatchTimeout(pub Duration);
