//! # Courier Core
//!
//! Core types shared by every layer of the Courier framework:
//!
//! - [`Update`] and friends: the inbound event model, deserialized straight
//!   from the provider's JSON
//! - [`Command`]: the parsed `/name args` payload of a command message
//! - [`MessageClient`], [`UpdateSource`], [`Connector`]: the seams to the
//!   messaging provider
//! - [`ApiError`], [`TransportError`]: errors raised at those seams
//!
//! Nothing in this crate performs I/O; concrete transports live in
//! `courier-transport`.

pub mod client;
pub mod error;
pub mod update;

pub use client::{BoxedClient, BoxedSource, Connection, Connector, MessageClient, UpdateSource};
pub use error::{ApiError, ApiResult, TransportError, TransportResult};
pub use update::{Chat, Command, Message, MessageEntity, OutgoingMessage, Update, User};
