//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use courier_core::{ApiError, ApiResult, Chat, Message, MessageClient, OutgoingMessage, Update, User};

/// A client that records every message and optionally fails each send.
pub(crate) struct RecordingClient {
    sent: Mutex<Vec<OutgoingMessage>>,
    fail: bool,
}

impl RecordingClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub(crate) fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageClient for RecordingClient {
    async fn send(&self, message: OutgoingMessage) -> ApiResult<i64> {
        if self.fail {
            return Err(ApiError::Http("connection refused".into()));
        }
        let mut sent = self.sent.lock();
        sent.push(message);
        Ok(sent.len() as i64)
    }
}

/// An update whose message has `text`, sent by user 99 in chat 10 as
/// message 1000.
pub(crate) fn command_update(update_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: 1000,
            from: Some(User {
                id: 99,
                is_bot: false,
                first_name: "Ada".into(),
                username: None,
            }),
            chat: Chat {
                id: 10,
                kind: "private".into(),
            },
            text: Some(text.into()),
            entities: Vec::new(),
        }),
    }
}
