//! An in-process fake of the Bot API for tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

use courier_core::{Chat, Message, OutgoingMessage, Update, User};

use crate::config::TelegramConfig;

pub(crate) const TOKEN: &str = "123:test";

#[derive(Default)]
struct MockState {
    batches: Mutex<VecDeque<Vec<Update>>>,
    offsets: Mutex<Vec<i64>>,
    sent: Mutex<Vec<OutgoingMessage>>,
    webhooks: Mutex<Vec<Option<String>>>,
    failing_polls: Mutex<usize>,
}

pub(crate) struct MockBotApi {
    base_url: String,
    state: Arc<MockState>,
}

impl MockBotApi {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let router = Router::new()
            .route("/{bot}/{method}", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub(crate) fn config(&self) -> TelegramConfig {
        let mut config = TelegramConfig::new(TOKEN);
        config.api_url = self.base_url.clone();
        config.poll_timeout = Duration::from_secs(1);
        config
    }

    pub(crate) fn push_updates(&self, updates: Vec<Update>) {
        self.state.batches.lock().push_back(updates);
    }

    pub(crate) fn fail_next_polls(&self, count: usize) {
        *self.state.failing_polls.lock() = count;
    }

    pub(crate) fn offsets(&self) -> Vec<i64> {
        self.state.offsets.lock().clone()
    }

    pub(crate) fn sent(&self) -> Vec<OutgoingMessage> {
        self.state.sent.lock().clone()
    }

    /// `setWebhook` urls, with `None` for each `deleteWebhook`.
    pub(crate) fn webhooks(&self) -> Vec<Option<String>> {
        self.state.webhooks.lock().clone()
    }
}

fn ok(result: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "ok": true, "result": result })))
}

fn fail(status: StatusCode, description: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "ok": false,
            "error_code": status.as_u16(),
            "description": description,
        })),
    )
}

async fn handle(
    State(state): State<Arc<MockState>>,
    Path((bot, method)): Path<(String, String)>,
    Json(params): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if bot != format!("bot{TOKEN}") {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match method.as_str() {
        "getMe" => ok(json!({
            "id": 1,
            "is_bot": true,
            "first_name": "Courier",
            "username": "courier_bot",
        })),
        "getUpdates" => {
            state
                .offsets
                .lock()
                .push(params["offset"].as_i64().unwrap_or_default());
            {
                let mut failing = state.failing_polls.lock();
                if *failing > 0 {
                    *failing -= 1;
                    return fail(StatusCode::BAD_GATEWAY, "Bad Gateway");
                }
            }
            let batch = state.batches.lock().pop_front();
            match batch {
                Some(updates) => ok(serde_json::to_value(updates).unwrap()),
                None => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    ok(json!([]))
                }
            }
        }
        "sendMessage" => {
            let mut message = OutgoingMessage::new(
                params["chat_id"].as_i64().unwrap_or_default(),
                params["text"].as_str().unwrap_or_default(),
            );
            if let Some(id) = params["reply_to_message_id"].as_i64() {
                message = message.reply_to(id);
            }
            let chat_id = message.chat_id;
            let message_id = {
                let mut sent = state.sent.lock();
                sent.push(message);
                sent.len() as i64
            };
            ok(json!({
                "message_id": message_id,
                "chat": { "id": chat_id, "type": "private" },
            }))
        }
        "setWebhook" => {
            let url = params["url"].as_str().map(str::to_string);
            state.webhooks.lock().push(url);
            ok(json!(true))
        }
        "deleteWebhook" => {
            state.webhooks.lock().push(None);
            ok(json!(true))
        }
        _ => fail(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// A private-chat text message from user 7 in chat 42.
pub(crate) fn text_update(update_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id * 10,
            from: Some(User {
                id: 7,
                is_bot: false,
                first_name: "Grace".into(),
                username: None,
            }),
            chat: Chat {
                id: 42,
                kind: "private".into(),
            },
            text: Some(text.into()),
            entities: Vec::new(),
        }),
    }
}
