//! Webhook update source.

use std::net::SocketAddr;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use courier_core::{TransportError, TransportResult, Update};

const DEFAULT_BUFFER: usize = 100;

/// Accepts updates posted by the Bot API.
#[derive(Debug, Clone)]
pub struct WebhookServer {
    listen: String,
    path: String,
    buffer: usize,
}

impl WebhookServer {
    pub fn new(listen: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };

        Self {
            listen: listen.into(),
            path,
            buffer: DEFAULT_BUFFER,
        }
    }

    pub fn buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Binds the listener and starts serving in the background.
    ///
    /// Returns the update channel and the bound address. The server stops
    /// when `shutdown` is cancelled.
    pub async fn start(
        self,
        shutdown: CancellationToken,
    ) -> TransportResult<(mpsc::Receiver<Update>, SocketAddr)> {
        let bind_error = |e: std::io::Error| TransportError::Bind {
            addr: self.listen.clone(),
            reason: e.to_string(),
        };

        let listener = tokio::net::TcpListener::bind(&self.listen)
            .await
            .map_err(bind_error)?;
        let actual_addr = listener.local_addr().map_err(bind_error)?;

        let (tx, rx) = mpsc::channel(self.buffer);
        let router = Router::new()
            .route(&self.path, post(receive_update))
            .with_state(tx);

        info!(addr = %actual_addr, path = %self.path, "Webhook server listening");

        tokio::spawn(async move {
            let server = axum::serve(listener, router);
            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        error!(error = %e, "Webhook server error");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Webhook server shutting down");
                }
            }
        });

        Ok((rx, actual_addr))
    }
}

async fn receive_update(
    State(tx): State<mpsc::Sender<Update>>,
    Json(update): Json<Update>,
) -> StatusCode {
    trace!(update_id = update.update_id, "Received webhook update");
    match tx.send(update).await {
        Ok(()) => StatusCode::OK,
        Err(_) => {
            warn!("Update receiver dropped, refusing webhook update");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
