//! # Courier Framework
//!
//! The command-dispatch pipeline:
//!
//! - [`Router`] collects routes and middleware during registration and is
//!   sealed into an immutable [`RouteTable`] before serving
//! - [`Handler`] is one unit of application logic; closures
//!   `Fn(Context) -> impl Future<Output = HandlerResult>` implement it
//! - [`Context`] threads identity, cancellation and locals through a chain
//! - [`Dispatcher`] classifies an update, finds its route and drives the
//!   chain under the configured [`ChainPolicy`]
//!
//! ```rust,ignore
//! use courier_framework::{Router, chain};
//!
//! let mut router = Router::new();
//! router
//!     .middleware(log_request)
//!     .command("start", chain![greet])
//!     .command("echo", chain![echo]);
//! let routes = router.seal()?;
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod router;

#[cfg(test)]
mod testing;

pub use context::{Context, SendErrorPolicy};
pub use dispatcher::{
    ChainPolicy, Dispatched, Dispatcher, ErrorHandler, default_error_handler, error_handler_fn,
};
pub use error::{ChainError, DispatchTimeout, RouteError};
pub use handler::{BoxFuture, BoxedHandler, Handler, HandlerResult, into_handler};
pub use router::{Method, Route, RouteTable, Router};

/// Builds a `Vec<BoxedHandler>` from a list of handlers.
///
/// ```rust,ignore
/// router.command("start", chain![auth, greet]);
/// ```
#[macro_export]
macro_rules! chain {
    () => {
        ::std::vec::Vec::<$crate::BoxedHandler>::new()
    };
    ($($handler:expr),+ $(,)?) => {
        ::std::vec![$($crate::into_handler($handler)),+]
    };
}
