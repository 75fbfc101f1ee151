//! Long-poll update source.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use courier_core::Update;

use super::client::TelegramClient;

/// Delay before retrying a failed `getUpdates` call.
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

const DEFAULT_BUFFER: usize = 100;

/// Polls `getUpdates` in a background task and feeds a channel.
///
/// ```rust,ignore
/// let mut updates = LongPoller::new(client, Duration::from_secs(60)).spawn(shutdown);
/// while let Some(update) = updates.recv().await { /* ... */ }
/// ```
#[derive(Debug)]
pub struct LongPoller {
    client: TelegramClient,
    timeout: Duration,
    buffer: usize,
    retry_delay: Duration,
}

impl LongPoller {
    pub fn new(client: TelegramClient, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            buffer: DEFAULT_BUFFER,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Capacity of the update channel.
    pub fn buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Starts polling. The task stops when `shutdown` is cancelled or the
    /// returned receiver is dropped.
    pub fn spawn(self, shutdown: CancellationToken) -> mpsc::Receiver<Update> {
        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(self.run(tx, shutdown));
        rx
    }

    async fn run(self, tx: mpsc::Sender<Update>, shutdown: CancellationToken) {
        info!(timeout = ?self.timeout, "Long polling started");
        let mut offset = 0;

        loop {
            let batch = tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tx.closed() => break,
                result = self.client.get_updates(offset, self.timeout) => result,
            };

            let updates = match batch {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, retry_in = ?self.retry_delay, "Failed to get updates");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_delay) => continue,
                    }
                }
            };

            trace!(count = updates.len(), offset, "Received updates");
            for update in updates {
                offset = offset.max(update.update_id + 1);
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    result = tx.send(update) => {
                        if result.is_err() {
                            debug!("Update receiver dropped, stopping long polling");
                            return;
                        }
                    }
                }
            }
        }

        info!("Long polling stopped");
    }
}
