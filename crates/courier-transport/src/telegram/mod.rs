//! Telegram Bot API transport.

mod client;
mod connector;
mod polling;
#[cfg(feature = "http-server")]
mod webhook;

#[cfg(all(test, feature = "http-server"))]
mod mock;

pub use client::TelegramClient;
pub use connector::TelegramConnector;
pub use polling::LongPoller;
#[cfg(feature = "http-server")]
pub use webhook::WebhookServer;
