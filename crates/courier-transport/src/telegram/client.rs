//! Bot API HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use courier_core::{
    ApiError, ApiResult, Message, MessageClient, OutgoingMessage, TransportError,
    TransportResult, Update, User,
};

use crate::config::TelegramConfig;

/// Slack on top of the long-poll timeout before a request is abandoned.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// The `{ ok, result, description, error_code }` envelope of every reply.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> ApiResult<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(ApiError::Decode("ok response without result".into())),
            (false, _) => Err(ApiError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
}

#[derive(Serialize)]
struct SetWebhook<'a> {
    url: &'a str,
}

/// A Bot API client bound to one bot token.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    /// `{api_url}/bot{token}`
    endpoint: String,
    debug: bool,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> TransportResult<Self> {
        let http = ClientBuilder::new()
            .timeout(config.poll_timeout + REQUEST_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.token
            ),
            debug: config.debug,
        })
    }

    /// Calls a Bot API method with JSON parameters.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> ApiResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if self.debug {
            let body = serde_json::to_string(params).unwrap_or_default();
            debug!(method, body = %body, "Bot API request");
        } else {
            trace!(method, "Bot API request");
        }

        let response = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .json(params)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Http(e.without_url().to_string()))?;

        if self.debug {
            debug!(
                method,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "Bot API response"
            );
        }

        serde_json::from_slice::<ApiResponse<R>>(&body)
            .map_err(|e| ApiError::Decode(format!("HTTP {}: {e}", status.as_u16())))?
            .into_result()
    }

    /// Returns the bot's own account. Fails with code 401 for a bad token.
    pub async fn get_me(&self) -> ApiResult<User> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-polls for updates with ids of at least `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> ApiResult<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
        };
        self.call("getUpdates", &params).await
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<Message> {
        self.call("sendMessage", message).await
    }

    pub async fn set_webhook(&self, url: &str) -> ApiResult<bool> {
        self.call("setWebhook", &SetWebhook { url }).await
    }

    pub async fn delete_webhook(&self) -> ApiResult<bool> {
        self.call("deleteWebhook", &serde_json::json!({})).await
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageClient for TelegramClient {
    async fn send(&self, message: OutgoingMessage) -> ApiResult<i64> {
        let sent = self.send_message(&message).await?;
        Ok(sent.message_id)
    }
}


#[cfg(all(test, feature = "http-server"))]
mod api_tests {
    use super::*;
    use crate::telegram::mock::MockBotApi;

    #[tokio::test]
    async fn test_send_message_against_mock() {
        let api = MockBotApi::start().await;
        let client = TelegramClient::new(&api.config()).unwrap();

        let id = client
            .send(OutgoingMessage::new(10, "hi").reply_to(3))
            .await
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(api.sent(), vec![OutgoingMessage::new(10, "hi").reply_to(3)]);
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let api = MockBotApi::start().await;
        let mut config = api.config();
        config.token = "wrong".into();
        let client = TelegramClient::new(&config).unwrap();

        let err = client.get_me().await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
