//! Handler system for the Courier framework.
//!
//! A handler is an async function taking the per-update [`Context`] and
//! returning a [`HandlerResult`]. Any closure or `async fn` with that shape
//! implements [`Handler`] through a blanket implementation:
//!
//! ```rust,ignore
//! async fn greet(ctx: Context) -> HandlerResult {
//!     ctx.string("hello", true).await
//! }
//!
//! router.command("start", chain![greet]);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The result of running one handler.
///
/// Handlers return `anyhow::Error` so product code can use `?` on any error.
pub type HandlerResult = anyhow::Result<()>;

/// One unit of application logic invoked during dispatch.
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler against `ctx`.
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx))
    }
}

/// A type-erased handler that can be stored in a chain.
pub type BoxedHandler = Arc<dyn Handler>;

/// Convert a handler into a boxed handler.
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}
