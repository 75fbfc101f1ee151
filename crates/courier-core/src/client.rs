//! Provider-facing traits.
//!
//! The dispatch core never talks to the network directly. It sends replies
//! through a [`MessageClient`] and reads updates from an [`UpdateSource`];
//! a [`Connector`] produces both once the credentials have been checked.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiResult, TransportResult};
use crate::update::{OutgoingMessage, Update};

/// Sends messages back to the provider.
#[async_trait]
pub trait MessageClient: Send + Sync + 'static {
    /// Sends a message and returns the id the provider assigned to it.
    async fn send(&self, message: OutgoingMessage) -> ApiResult<i64>;
}

/// A shared message client.
pub type BoxedClient = Arc<dyn MessageClient>;

/// An ordered sequence of inbound updates.
///
/// The feed loop calls [`recv`](Self::recv) until it returns `None`, which
/// means the source is exhausted or closed.
#[async_trait]
pub trait UpdateSource: Send + 'static {
    async fn recv(&mut self) -> Option<Update>;
}

#[async_trait]
impl UpdateSource for mpsc::Receiver<Update> {
    async fn recv(&mut self) -> Option<Update> {
        mpsc::Receiver::recv(self).await
    }
}

/// A boxed update source.
pub type BoxedSource = Box<dyn UpdateSource>;

/// An established link to the provider.
pub struct Connection {
    pub client: BoxedClient,
    pub updates: BoxedSource,
}

impl Connection {
    pub fn new(client: BoxedClient, updates: impl UpdateSource) -> Self {
        Self {
            client,
            updates: Box::new(updates),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Establishes a [`Connection`].
///
/// Implementations validate credentials before returning; any error here is
/// fatal for `run()`. Background tasks spawned by the connector must stop
/// once `shutdown` is cancelled.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, shutdown: CancellationToken) -> TransportResult<Connection>;
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for &C {
    async fn connect(&self, shutdown: CancellationToken) -> TransportResult<Connection> {
        (**self).connect(shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_yields_in_order_then_closes() {
        let (tx, rx) = mpsc::channel(4);
        let mut source: BoxedSource = Box::new(rx);

        for id in 1..=2 {
            tx.send(Update {
                update_id: id,
                message: None,
            })
            .await
            .unwrap();
        }
        drop(tx);

        assert_eq!(source.recv().await.map(|u| u.update_id), Some(1));
        assert_eq!(source.recv().await.map(|u| u.update_id), Some(2));
        assert!(source.recv().await.is_none());
    }
}
