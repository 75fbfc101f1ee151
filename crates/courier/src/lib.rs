//! # Courier
//!
//! A command-dispatch framework for Telegram bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────┐   ┌────────────┐   ┌──────────────────────┐
//! │ Bot API   │──▶│ Feed loop   │──▶│ WorkerPool │──▶│ Dispatcher           │
//! │ (poll or  │   │ (App)       │   │ (N workers)│   │ route → chain[0..k]  │
//! │  webhook) │   └─────────────┘   └────────────┘   └──────────────────────┘
//! └───────────┘
//! ```
//!
//! - **Router**: command routes plus global middleware, sealed before serving
//! - **Context**: per-update identity, locals, `next()` and replies
//! - **Dispatcher**: runs the matched chain and reports failures once
//! - **App**: configuration, connection and the bounded serve loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! async fn start(ctx: Context) -> HandlerResult {
//!     ctx.string("Hello!", true).await
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut app = App::from_loader(ConfigLoader::new())?;
//!     app.command("start", chain![start]);
//!     app.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: read `courier.toml`
//! - `http-client` *(default)*: long polling against the Bot API
//! - `http-server`: webhook delivery
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

pub use courier_framework::chain;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Application entry point
    pub use courier_runtime::{App, ConfigLoader, CourierConfig, LoggingBuilder, SpanEvents};

    // Handlers and routing
    pub use courier_framework::{
        ChainPolicy, Context, ErrorHandler, Handler, HandlerResult, Method, SendErrorPolicy,
        chain, error_handler_fn,
    };

    // Update model
    pub use courier_core::{Command, Message, OutgoingMessage, Update, User};

    pub use courier_runtime::prelude::*;
}
