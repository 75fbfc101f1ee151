//! Connects the runtime to the Bot API.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use courier_core::{
    ApiError, BoxedClient, Connection, Connector, TransportError, TransportResult,
};

use super::client::TelegramClient;
use super::polling::LongPoller;
use crate::config::TelegramConfig;

/// Builds a [`Connection`] to the Bot API.
///
/// Connecting calls `getMe` to check the token, then starts long polling or,
/// when a webhook is configured, the webhook listener.
#[derive(Debug, Clone)]
pub struct TelegramConnector {
    config: TelegramConfig,
}

impl TelegramConnector {
    pub fn new(config: TelegramConfig) -> Self {
        Self { config }
    }
}

fn setup_error(e: ApiError) -> TransportError {
    if e.is_unauthorized() {
        TransportError::InvalidCredentials(e.to_string())
    } else {
        TransportError::Api(e)
    }
}

#[async_trait]
impl Connector for TelegramConnector {
    async fn connect(&self, shutdown: CancellationToken) -> TransportResult<Connection> {
        let client = TelegramClient::new(&self.config)?;

        let me = client.get_me().await.map_err(setup_error)?;
        info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or_default(),
            "Authorized on account"
        );

        let boxed: BoxedClient = Arc::new(client.clone());
        match &self.config.webhook {
            None => {
                // getUpdates is refused while a webhook is registered.
                client.delete_webhook().await.map_err(setup_error)?;
                let updates = LongPoller::new(client, self.config.poll_timeout).spawn(shutdown);
                Ok(Connection::new(boxed, updates))
            }
            #[cfg(feature = "http-server")]
            Some(settings) => {
                use super::webhook::WebhookServer;

                let (updates, _addr) = WebhookServer::new(&settings.listen, &settings.path)
                    .start(shutdown.clone())
                    .await?;
                if let Some(url) = &settings.public_url {
                    if let Err(e) = client.set_webhook(url).await {
                        shutdown.cancel();
                        return Err(setup_error(e));
                    }
                    info!(url = %url, "Webhook registered");
                }
                Ok(Connection::new(boxed, updates))
            }
            #[cfg(not(feature = "http-server"))]
            Some(_) => Err(TransportError::InvalidConfig(
                "webhook delivery requires the http-server feature".into(),
            )),
        }
    }
}

#[cfg(all(test, feature = "http-server"))]
mod tests {
    use super::*;
    use crate::config::WebhookSettings;
    use crate::telegram::mock::{MockBotApi, text_update};
    use courier_core::OutgoingMessage;

    #[tokio::test]
    async fn test_bad_token_is_invalid_credentials() {
        let api = MockBotApi::start().await;
        let mut config = api.config();
        config.token = "wrong".into();

        let result = TelegramConnector::new(config)
            .connect(CancellationToken::new())
            .await;
        assert!(matches!(result, Err(TransportError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_long_polling_connection() {
        let api = MockBotApi::start().await;
        api.push_updates(vec![text_update(1, "/start")]);

        let shutdown = CancellationToken::new();
        let Connection {
            client,
            mut updates,
        } = TelegramConnector::new(api.config())
            .connect(shutdown.clone())
            .await
            .unwrap();

        assert_eq!(updates.recv().await.map(|u| u.update_id), Some(1));
        client.send(OutgoingMessage::new(42, "welcome")).await.unwrap();
        assert_eq!(api.sent(), vec![OutgoingMessage::new(42, "welcome")]);
        assert_eq!(api.webhooks(), vec![None]);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_webhook_connection_registers_public_url() {
        let api = MockBotApi::start().await;
        let mut config = api.config();
        config.webhook = Some(WebhookSettings {
            listen: "127.0.0.1:0".into(),
            path: "/tg".into(),
            public_url: Some("https://bot.example.com/tg".into()),
        });

        let shutdown = CancellationToken::new();
        TelegramConnector::new(config)
            .connect(shutdown.clone())
            .await
            .unwrap();

        assert_eq!(
            api.webhooks(),
            vec![Some("https://bot.example.com/tg".to_string())]
        );
        shutdown.cancel();
    }
}
