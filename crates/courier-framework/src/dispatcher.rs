//! Update dispatcher for the Courier framework.
//!
//! The [`Dispatcher`] turns one inbound [`Update`] into one run of a handler
//! chain:
//!
//! 1. The update is classified. Non-command updates are ignored silently.
//! 2. The first route whose path equals the command name is selected.
//!    Updates without a matching route are dropped without error.
//! 3. A fresh [`Context`] is built and the chain runs under the configured
//!    [`ChainPolicy`].
//! 4. Failures are reported once to the [`ErrorHandler`].
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(Arc::new(routes), client)
//!     .policy(ChainPolicy::FullChain)
//!     .timeout(Some(Duration::from_secs(30)));
//!
//! dispatcher.dispatch(update, CancellationToken::new()).await;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, debug, span, trace, warn};

use courier_core::{BoxedClient, Update};

use crate::context::{Context, SendErrorPolicy};
use crate::error::{ChainError, DispatchTimeout};
use crate::handler::{BoxFuture, HandlerResult};
use crate::router::{Method, RouteTable};

/// How a matched chain is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainPolicy {
    /// Run every handler in order, collecting all errors into one
    /// [`ChainError`]. A failing handler does not stop the chain.
    #[default]
    FullChain,
    /// Run only the first handler; the rest runs only through
    /// [`Context::next`].
    FirstHandler,
}

/// Receives the error of a failed dispatch.
pub type ErrorHandler =
    Arc<dyn Fn(Context, anyhow::Error) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async function into an [`ErrorHandler`].
pub fn error_handler_fn<F, Fut>(f: F) -> ErrorHandler
where
    F: Fn(Context, anyhow::Error) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(
        move |ctx: Context, err: anyhow::Error| -> BoxFuture<'static, ()> {
            Box::pin(f(ctx, err))
        },
    )
}

/// Sends the error text back to the originating chat (not as a reply).
pub fn default_error_handler() -> ErrorHandler {
    error_handler_fn(|ctx: Context, err: anyhow::Error| async move {
        if let Err(e) = ctx.string(err.to_string(), false).await {
            warn!(error = %e, "Failed to report handler error to chat");
        }
    })
}

/// The outcome of dispatching one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The update is not a command.
    Ignored,
    /// No route matched the command.
    Unmatched,
    /// The chain ran without errors.
    Handled,
    /// The chain ran and the error handler was invoked.
    Failed,
    /// The chain was abandoned after the dispatch timeout.
    TimedOut,
}

/// Matches updates to routes and executes their chains.
///
/// `Dispatcher` is `Send + Sync` and is shared by every worker.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    client: BoxedClient,
    error_handler: ErrorHandler,
    policy: ChainPolicy,
    send_errors: SendErrorPolicy,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default policies and error handler.
    pub fn new(routes: Arc<RouteTable>, client: BoxedClient) -> Self {
        Self {
            routes,
            client,
            error_handler: default_error_handler(),
            policy: ChainPolicy::default(),
            send_errors: SendErrorPolicy::default(),
            timeout: None,
        }
    }

    pub fn policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn send_errors(mut self, policy: SendErrorPolicy) -> Self {
        self.send_errors = policy;
        self
    }

    /// Bounds the run time of each chain. `None` disables the bound.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Dispatches one update.
    ///
    /// `scope` becomes the context's cancellation token. It is cancelled
    /// here if the dispatch times out.
    pub async fn dispatch(&self, update: Update, scope: CancellationToken) -> Dispatched {
        let Some(method) = Method::classify(&update) else {
            trace!(update_id = update.update_id, "Ignoring non-command update");
            return Dispatched::Ignored;
        };
        let Some(command) = update.command() else {
            return Dispatched::Ignored;
        };

        let span = span!(
            Level::DEBUG,
            "dispatch",
            update_id = update.update_id,
            command = %command.name
        );

        async move {
            let Some(route) = self.routes.find(method, &command.name) else {
                debug!("No route matched, dropping update");
                return Dispatched::Unmatched;
            };

            let chain = Arc::clone(route.handlers());
            let Some(ctx) = Context::new(
                update,
                chain,
                Arc::clone(&self.client),
                scope.clone(),
                self.send_errors,
            ) else {
                return Dispatched::Ignored;
            };

            let run = self.run_chain(ctx.clone());
            let result = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(timeout = ?limit, "Dispatch timed out, abandoning chain");
                        scope.cancel();
                        (self.error_handler)(ctx, DispatchTimeout(limit).into()).await;
                        return Dispatched::TimedOut;
                    }
                },
                None => run.await,
            };

            match result {
                Ok(()) => Dispatched::Handled,
                Err(err) => {
                    debug!(error = %err, "Handler chain failed");
                    (self.error_handler)(ctx, err).await;
                    Dispatched::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_chain(&self, ctx: Context) -> HandlerResult {
        let chain = Arc::clone(ctx.chain());
        match self.policy {
            ChainPolicy::FirstHandler => match chain.first() {
                Some(handler) => {
                    ctx.set_cursor(0);
                    handler.call(ctx).await
                }
                None => Ok(()),
            },
            ChainPolicy::FullChain => {
                let mut errors = Vec::new();
                let mut index = 0;
                while let Some(handler) = chain.get(index) {
                    ctx.set_cursor(index);
                    trace!(handler_index = index, "Executing handler");
                    if let Err(err) = handler.call(ctx.clone()).await {
                        errors.push(err);
                    }
                    // Handlers that called `next()` already ran what they advanced over.
                    index = ctx.cursor().max(index) + 1;
                }

                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(ChainError::new(errors).into())
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("route_count", &self.routes.len())
            .field("policy", &self.policy)
            .field("send_errors", &self.send_errors)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
