//! The application façade.
//!
//! [`App`] owns the configuration and the route registrations, and runs the
//! serve loop:
//!
//! 1. validate the configuration
//! 2. seal the routes (duplicates are rejected here)
//! 3. connect to the provider, which checks the credentials
//! 4. start the worker pool
//! 5. feed every update into the pool until the source closes or shutdown
//!    is requested
//! 6. drain the pool
//!
//! Failures in steps 1 to 4 are returned before any update is read.
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut app = App::from_loader(ConfigLoader::new())?;
//!     app.command("start", chain![start]);
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use courier_core::{Connection, Connector, Update};
use courier_framework::{
    BoxedHandler, ChainPolicy, Dispatcher, ErrorHandler, Handler, Method, Router,
};

use crate::config::{ConfigLoader, CourierConfig, validate_serving};
use crate::error::RuntimeResult;
use crate::pool::WorkerPool;

/// A bot application: configuration plus routes.
pub struct App {
    config: CourierConfig,
    router: Router,
    error_handler: Option<ErrorHandler>,
}

impl App {
    pub fn new(config: CourierConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            error_handler: None,
        }
    }

    /// Creates an app from a configuration loader.
    pub fn from_loader(loader: ConfigLoader) -> RuntimeResult<Self> {
        Ok(Self::new(loader.load()?))
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Registers a command route. See [`Router::command`].
    pub fn command<I>(&mut self, path: impl Into<String>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.router.command(path, handlers);
        self
    }

    /// Registers a route for `method`. See [`Router::add`].
    pub fn add<I>(&mut self, method: Method, path: impl Into<String>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.router.add(method, path, handlers);
        self
    }

    /// Registers global middleware. See [`Router::middleware`].
    pub fn middleware<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.router.middleware(handler);
        self
    }

    /// Replaces the default error handler.
    pub fn error_handler(&mut self, handler: ErrorHandler) -> &mut Self {
        self.error_handler = Some(handler);
        self
    }

    /// Serves Telegram updates until Ctrl+C or SIGTERM.
    ///
    /// Initializes logging from the configuration first.
    #[cfg(feature = "http-client")]
    pub async fn run(self) -> RuntimeResult<()> {
        crate::logging::init_from_config(&self.config.logging);
        crate::config::validate_config(&self.config)?;

        let connector =
            courier_transport::TelegramConnector::new(self.config.bot.to_telegram_config());
        self.run_until(connector, wait_for_shutdown()).await
    }

    /// Serves updates from `connector` until its source closes.
    pub async fn run_with<C: Connector>(self, connector: C) -> RuntimeResult<()> {
        self.run_until(connector, std::future::pending()).await
    }

    /// Serves updates from `connector` until its source closes or `shutdown`
    /// resolves.
    ///
    /// On shutdown, in-flight handlers see their context cancelled and the
    /// call returns once they have finished.
    pub async fn run_until<C, F>(self, connector: C, shutdown: F) -> RuntimeResult<()>
    where
        C: Connector,
        F: Future<Output = ()>,
    {
        validate_serving(&self.config)?;
        let dispatch = &self.config.dispatch;

        let routes = Arc::new(self.router.seal()?);
        debug!(routes = routes.len(), "Routes sealed");
        if dispatch.chain_policy == ChainPolicy::FirstHandler {
            for route in routes.with_trailing_middleware() {
                warn!(
                    method = %route.method(),
                    path = route.path(),
                    skipped = route.trailing_middleware(),
                    "Middleware registered after this route runs only if a handler calls next() under first-handler policy"
                );
            }
        }

        let source_token = CancellationToken::new();
        let Connection {
            client,
            mut updates,
        } = connector.connect(source_token.clone()).await?;
        info!("Connected to provider");

        let mut dispatcher = Dispatcher::new(routes, client)
            .policy(dispatch.chain_policy)
            .send_errors(dispatch.send_errors)
            .timeout(dispatch.timeout());
        if let Some(handler) = self.error_handler {
            dispatcher = dispatcher.error_handler(handler);
        }
        let dispatcher = Arc::new(dispatcher);

        let pool = WorkerPool::new(
            dispatch.pool_capacity,
            dispatch.saturation,
            move |update: Update, scope: CancellationToken| {
                let dispatcher = Arc::clone(&dispatcher);
                async move {
                    dispatcher.dispatch(update, scope).await;
                }
            },
        );
        let pool = match pool {
            Ok(pool) => pool,
            Err(e) => {
                source_token.cancel();
                return Err(e.into());
            }
        };
        info!(
            capacity = pool.capacity(),
            policy = ?dispatch.chain_policy,
            "Courier is now serving"
        );

        tokio::pin!(shutdown);
        loop {
            let update = tokio::select! {
                update = updates.recv() => update,
                _ = &mut shutdown => {
                    info!("Shutdown requested, cancelling in-flight work");
                    pool.cancel();
                    break;
                }
            };
            let Some(update) = update else {
                info!("Update source closed");
                break;
            };

            let update_id = update.update_id;
            tokio::select! {
                result = pool.submit(update) => {
                    if let Err(e) = result {
                        warn!(update_id, error = %e, "Dropping update");
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, cancelling in-flight work");
                    pool.cancel();
                    break;
                }
            }
        }

        source_token.cancel();
        pool.shutdown().await;
        info!("Courier stopped");
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
#[cfg_attr(not(feature = "http-client"), allow(dead_code))]
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}
