//! Per-update context.
//!
//! A [`Context`] is created by the [`Dispatcher`](crate::Dispatcher) for each
//! command update and handed to every handler of the matched chain. It is a
//! cheap handle around shared state, so handlers receive it by value and
//! clones all see the same cursor and locals. Nothing in a context outlives
//! the dispatch of its update.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use courier_core::{BoxedClient, Command, Message, OutgoingMessage, Update};

use crate::handler::{BoxedHandler, HandlerResult};

/// What [`Context::string`] does when the provider rejects a send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendErrorPolicy {
    /// Log the failure and report success to the handler.
    #[default]
    Swallow,
    /// Return the failure to the handler as an error.
    Surface,
}

struct ContextInner {
    update_id: i64,
    message: Message,
    command: Option<Command>,
    user_id: Option<i64>,
    chat_id: i64,
    message_id: i64,
    chain: Arc<[BoxedHandler]>,
    cursor: AtomicUsize,
    locals: Mutex<HashMap<String, Value>>,
    client: BoxedClient,
    scope: CancellationToken,
    send_errors: SendErrorPolicy,
}

/// The context object passed to handlers.
///
/// # Example
///
/// ```rust,ignore
/// async fn auth(ctx: Context) -> HandlerResult {
///     ctx.set_local("role", "admin");
///     ctx.next().await
/// }
///
/// async fn greet(ctx: Context) -> HandlerResult {
///     let role: Option<String> = ctx.local_as("role");
///     ctx.string(format!("hello {}", role.unwrap_or_default()), true).await
/// }
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Builds a context for `update`, or `None` if it carries no message.
    pub(crate) fn new(
        update: Update,
        chain: Arc<[BoxedHandler]>,
        client: BoxedClient,
        scope: CancellationToken,
        send_errors: SendErrorPolicy,
    ) -> Option<Self> {
        let update_id = update.update_id;
        let message = update.message?;
        let command = message.command();
        let user_id = message.from.as_ref().map(|user| user.id);
        let chat_id = message.chat.id;
        let message_id = message.message_id;

        Some(Self {
            inner: Arc::new(ContextInner {
                update_id,
                message,
                command,
                user_id,
                chat_id,
                message_id,
                chain,
                cursor: AtomicUsize::new(0),
                locals: Mutex::new(HashMap::new()),
                client,
                scope,
                send_errors,
            }),
        })
    }

    // ─── Identity ─────────────────────────────────────────────────────────────

    /// Returns the id of the triggering update.
    pub fn update_id(&self) -> i64 {
        self.inner.update_id
    }

    /// Returns the triggering message.
    pub fn message(&self) -> &Message {
        &self.inner.message
    }

    /// Returns the sender's user id, if the message has a sender.
    pub fn from_user_id(&self) -> Option<i64> {
        self.inner.user_id
    }

    pub fn from_chat_id(&self) -> i64 {
        self.inner.chat_id
    }

    pub fn from_message_id(&self) -> i64 {
        self.inner.message_id
    }

    /// Returns the parsed command, or `None` if the update is not a command.
    pub fn command(&self) -> Option<&Command> {
        self.inner.command.as_ref()
    }

    /// The cancellation scope of this dispatch.
    ///
    /// Cancelled when the service shuts down or the dispatch times out.
    /// Handlers doing further I/O should race it against their work.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.scope
    }

    /// Returns the message client, for sends beyond [`string`](Self::string).
    pub fn client(&self) -> &BoxedClient {
        &self.inner.client
    }

    // ─── Locals ───────────────────────────────────────────────────────────────

    /// Returns a clone of the local stored under `key`.
    pub fn local(&self, key: &str) -> Option<Value> {
        self.inner.locals.lock().get(key).cloned()
    }

    /// Stores `value` under `key` and returns the stored value.
    pub fn set_local(&self, key: impl Into<String>, value: impl Into<Value>) -> Value {
        let value = value.into();
        self.inner.locals.lock().insert(key.into(), value.clone());
        value
    }

    /// Returns the local under `key` decoded as `T`.
    ///
    /// `None` if the key is unset or holds a value of a different shape.
    pub fn local_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.local(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Removes and returns the local under `key`.
    pub fn take_local(&self, key: &str) -> Option<Value> {
        self.inner.locals.lock().remove(key)
    }

    // ─── Chain control ────────────────────────────────────────────────────────

    /// Runs the next handler of the matched chain.
    ///
    /// Returns that handler's result, or `Ok(())` once the chain is exhausted.
    pub async fn next(&self) -> HandlerResult {
        let index = self.inner.cursor.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(handler) = self.inner.chain.get(index).cloned() else {
            return Ok(());
        };
        handler.call(self.clone()).await
    }

    pub(crate) fn chain(&self) -> &Arc<[BoxedHandler]> {
        &self.inner.chain
    }

    pub(crate) fn cursor(&self) -> usize {
        self.inner.cursor.load(Ordering::SeqCst)
    }

    pub(crate) fn set_cursor(&self, index: usize) {
        self.inner.cursor.store(index, Ordering::SeqCst);
    }

    // ─── Replies ──────────────────────────────────────────────────────────────

    /// Sends `text` to the originating chat.
    ///
    /// With `reply` set the message is sent as a reply to the triggering
    /// message. Send failures are handled per [`SendErrorPolicy`].
    pub async fn string(&self, text: impl Into<String>, reply: bool) -> HandlerResult {
        let mut message = OutgoingMessage::new(self.from_chat_id(), text);
        if reply {
            message = message.reply_to(self.from_message_id());
        }

        match self.inner.client.send(message).await {
            Ok(_) => Ok(()),
            Err(e) => match self.inner.send_errors {
                SendErrorPolicy::Swallow => {
                    warn!(chat_id = self.from_chat_id(), error = %e, "Failed to send message");
                    Ok(())
                }
                SendErrorPolicy::Surface => Err(e.into()),
            },
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("update_id", &self.inner.update_id)
            .field("command", &self.inner.command)
            .field("cursor", &self.cursor())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingClient, command_update};
    use serde_json::json;

    fn context(client: Arc<RecordingClient>, policy: SendErrorPolicy) -> Context {
        Context::new(
            command_update(1, "/start now"),
            Arc::from(Vec::<BoxedHandler>::new()),
            client,
            CancellationToken::new(),
            policy,
        )
        .unwrap()
    }

    #[test]
    fn test_identity_accessors() {
        let ctx = context(RecordingClient::new(), SendErrorPolicy::Swallow);
        assert_eq!(ctx.update_id(), 1);
        assert_eq!(ctx.from_user_id(), Some(99));
        assert_eq!(ctx.from_chat_id(), 10);
        assert_eq!(ctx.from_message_id(), 1000);
        assert_eq!(ctx.message().text.as_deref(), Some("/start now"));
        let cmd = ctx.command().unwrap();
        assert_eq!(cmd.name, "start");
        assert_eq!(cmd.args, "now");
    }

    #[test]
    fn test_update_without_message_has_no_context() {
        let update = Update {
            update_id: 5,
            message: None,
        };
        let ctx = Context::new(
            update,
            Arc::from(Vec::<BoxedHandler>::new()),
            RecordingClient::new(),
            CancellationToken::new(),
            SendErrorPolicy::Swallow,
        );
        assert!(ctx.is_none());
    }

    #[test]
    fn test_locals_get_set() {
        let ctx = context(RecordingClient::new(), SendErrorPolicy::Swallow);
        assert!(ctx.local("k").is_none());

        let stored = ctx.set_local("k", 42);
        assert_eq!(stored, json!(42));
        assert_eq!(ctx.local("k"), Some(json!(42)));
        assert_eq!(ctx.local_as::<u32>("k"), Some(42));
        assert_eq!(ctx.local_as::<String>("k"), None);

        // Clones share the same locals.
        let clone = ctx.clone();
        clone.set_local("k", "changed");
        assert_eq!(ctx.local_as::<String>("k").as_deref(), Some("changed"));
    }

    #[test]
    fn test_fresh_context_does_not_see_previous_locals() {
        let first = context(RecordingClient::new(), SendErrorPolicy::Swallow);
        first.set_local("user", "alice");
        let second = context(RecordingClient::new(), SendErrorPolicy::Swallow);
        assert!(second.local("user").is_none());
    }

    #[tokio::test]
    async fn test_string_reply_sets_reply_id() {
        let client = RecordingClient::new();
        let ctx = context(client.clone(), SendErrorPolicy::Swallow);

        ctx.string("one", false).await.unwrap();
        ctx.string("two", true).await.unwrap();

        let sent = client.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], OutgoingMessage::new(10, "one"));
        assert_eq!(sent[1], OutgoingMessage::new(10, "two").reply_to(1000));
    }

    #[tokio::test]
    async fn test_send_error_policy() {
        let swallow = context(RecordingClient::failing(), SendErrorPolicy::Swallow);
        assert!(swallow.string("hi", false).await.is_ok());

        let surface = context(RecordingClient::failing(), SendErrorPolicy::Surface);
        assert!(surface.string("hi", false).await.is_err());
    }

    #[tokio::test]
    async fn test_next_on_exhausted_chain_is_ok() {
        let ctx = context(RecordingClient::new(), SendErrorPolicy::Swallow);
        assert!(ctx.next().await.is_ok());
        assert!(ctx.next().await.is_ok());
    }
}
