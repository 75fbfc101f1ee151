//! Bounded worker pool.
//!
//! A [`WorkerPool`] runs a fixed number of long-lived worker tasks that pull
//! jobs from a shared queue. A semaphore with one permit per worker bounds
//! the work admitted to the pool: a permit is taken when a job is submitted
//! and released when a worker finishes it, so at most `capacity` jobs are
//! ever queued or running.
//!
//! ```rust,ignore
//! let pool = WorkerPool::new(4, SaturationPolicy::Block, |update, scope| async move {
//!     dispatcher.dispatch(update, scope).await;
//! })?;
//!
//! pool.submit(update).await?;
//! pool.shutdown().await;
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, TryAcquireError, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// What [`WorkerPool::submit`] does when every worker is busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaturationPolicy {
    /// Wait until a worker frees up.
    #[default]
    Block,
    /// Fail immediately with [`PoolError::Saturated`].
    Reject,
}

/// Errors raised by the worker pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Worker pool capacity must be greater than 0")]
    InvalidCapacity,

    #[error("All {0} workers are busy")]
    Saturated(usize),

    #[error("Worker pool is closed")]
    Closed,
}

type Job<T> = (T, OwnedSemaphorePermit);
type Queue<T> = Arc<Mutex<mpsc::UnboundedReceiver<Job<T>>>>;

/// A fixed-size pool of workers executing one job function.
pub struct WorkerPool<T> {
    sender: mpsc::UnboundedSender<Job<T>>,
    permits: Arc<Semaphore>,
    capacity: usize,
    policy: SaturationPolicy,
    token: CancellationToken,
    workers: JoinSet<()>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawns `capacity` workers running `job`.
    ///
    /// Each job receives a child of the pool's cancellation token. Must be
    /// called from within a Tokio runtime.
    pub fn new<F, Fut>(capacity: usize, policy: SaturationPolicy, job: F) -> Result<Self, PoolError>
    where
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: Queue<T> = Arc::new(Mutex::new(receiver));
        let job = Arc::new(job);
        let token = CancellationToken::new();

        let mut workers = JoinSet::new();
        for id in 0..capacity {
            workers.spawn(worker(id, Arc::clone(&queue), Arc::clone(&job), token.clone()));
        }
        debug!(capacity, ?policy, "Worker pool started");

        Ok(Self {
            sender,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            policy,
            token,
            workers,
        })
    }

    /// Hands `item` to the next free worker.
    ///
    /// Under [`SaturationPolicy::Block`] this waits for a free worker; under
    /// [`SaturationPolicy::Reject`] it fails with [`PoolError::Saturated`].
    /// After [`cancel`](Self::cancel) every submission fails with
    /// [`PoolError::Closed`].
    pub async fn submit(&self, item: T) -> Result<(), PoolError> {
        let permits = Arc::clone(&self.permits);
        let permit = match self.policy {
            SaturationPolicy::Block => permits
                .acquire_owned()
                .await
                .map_err(|_| PoolError::Closed)?,
            SaturationPolicy::Reject => permits.try_acquire_owned().map_err(|e| match e {
                TryAcquireError::NoPermits => PoolError::Saturated(self.capacity),
                TryAcquireError::Closed => PoolError::Closed,
            })?,
        };

        self.sender
            .send((item, permit))
            .map_err(|_| PoolError::Closed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs currently queued or running.
    pub fn running(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// The token whose children are handed to jobs.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels in-flight jobs and refuses further submissions.
    pub fn cancel(&self) {
        self.permits.close();
        self.token.cancel();
    }

    /// Closes the queue and waits until every accepted job has finished.
    pub async fn shutdown(self) {
        let Self {
            sender,
            mut workers,
            ..
        } = self;
        drop(sender);

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Worker task failed");
            }
        }
        debug!("Worker pool stopped");
    }
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity)
            .field("available", &self.permits.available_permits())
            .field("policy", &self.policy)
            .finish()
    }
}

async fn worker<T, F, Fut>(id: usize, queue: Queue<T>, job: Arc<F>, token: CancellationToken)
where
    F: Fn(T, CancellationToken) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let next = queue.lock().await.recv().await;
        let Some((item, permit)) = next else {
            break;
        };

        let run = AssertUnwindSafe(job(item, token.child_token()));
        if let Err(panic) = run.catch_unwind().await {
            error!(worker = id, panic = panic_message(&*panic), "Job panicked");
        }
        drop(permit);
    }
    trace!(worker = id, "Worker exited");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
