//! # Courier Transport
//!
//! The Telegram Bot API collaborator of the Courier framework.
//!
//! ## Features
//!
//! - `http-client`: [`TelegramClient`] and long polling through
//!   [`TelegramConnector`]
//! - `http-server`: webhook delivery through an axum listener
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  courier-runtime     │  (App, worker pool)
//! ├──────────────────────┤
//! │  courier-core        │  (Connector / MessageClient / UpdateSource)
//! ├──────────────────────┤
//! │  courier-transport   │  <- This crate (Telegram implementations)
//! ├──────────────────────┤
//! │  Bot API (HTTPS)     │
//! └──────────────────────┘
//! ```

pub mod config;

#[cfg(feature = "http-client")]
pub mod telegram;

pub use config::{TelegramConfig, WebhookSettings};

#[cfg(feature = "http-client")]
pub use telegram::{LongPoller, TelegramClient, TelegramConnector};

#[cfg(feature = "http-server")]
pub use telegram::WebhookServer;
