//! Serialization queue
//!
//! A FIFO job runner: jobs execute one at a time, each to completion, in
//! the order they were added. Every collection owns one queue, which is
//! what totally orders concurrent mutation requests.
//!
//! ## Execution model
//!
//! - `add` is synchronous: the submission order is fixed the moment it
//!   returns, before the caller awaits anything
//! - The processing loop is a tokio task spawned lazily on the first `add`
//! - Each job body runs in its own spawned task; a panic there is caught by
//!   the loop and rejects only that job with [`Error::UnknownTaskFailure`]
//! - A job failure never stops the loop
//!
//! When no tokio runtime is available the job is dropped and resolves to
//! [`Error::QueueClosed`].

use evig_core::{Error, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

struct Envelope {
    id: u64,
    run: Task,
}

/// Queue metrics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs added but not yet finished (including the running one)
    pub pending: usize,
    /// Jobs that resolved with `Ok`
    pub completed: u64,
    /// Jobs that resolved with an error or panicked
    pub failed: u64,
}

struct QueueInner {
    name: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
    next_id: AtomicU64,
    pending: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Strictly ordered, one-at-a-time async job runner
///
/// Dropping the queue lets the processing loop drain the jobs already
/// submitted and then exit.
pub struct SerialQueue {
    inner: Arc<QueueInner>,
}

impl SerialQueue {
    /// Create a queue; `name` labels its log lines
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                name: name.into(),
                sender: Mutex::new(None),
                next_id: AtomicU64::new(1),
                pending: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    /// Queue label
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Enqueue `task` and return a handle resolving to its result
    ///
    /// `task` is not invoked until every previously added job has finished.
    pub fn add<F, Fut, T>(&self, task: F) -> Job<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        let run: Task = Box::pin(async move {
            let outcome = match tokio::spawn(async move { task().await }).await {
                Ok(result) => result,
                Err(join_error) => {
                    warn!(
                        target: "evig::queue",
                        queue = %inner.name,
                        job = id,
                        panicked = join_error.is_panic(),
                        "Job aborted"
                    );
                    Err(Error::UnknownTaskFailure)
                }
            };
            match &outcome {
                Ok(_) => {
                    inner.completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    inner.failed.fetch_add(1, Ordering::Relaxed);
                    debug!(target: "evig::queue", queue = %inner.name, job = id, error = %e, "Job failed");
                }
            }
            inner.pending.fetch_sub(1, Ordering::AcqRel);
            // Receiver may have been dropped; the job still ran
            let _ = tx.send(outcome);
        });

        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        if !self.dispatch(Envelope { id, run }) {
            self.inner.pending.fetch_sub(1, Ordering::AcqRel);
            warn!(target: "evig::queue", queue = %self.inner.name, job = id, "No runtime available, job dropped");
        }

        Job { id, receiver: rx }
    }

    /// Jobs added but not yet finished
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Counters snapshot
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending(),
            completed: self.inner.completed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
        }
    }

    /// Hand the envelope to the processing loop, starting it if needed
    fn dispatch(&self, envelope: Envelope) -> bool {
        let mut sender = self.inner.sender.lock();

        let envelope = match sender.as_ref() {
            Some(tx) => match tx.send(envelope) {
                Ok(()) => return true,
                // Loop is gone (its runtime shut down); start a new one below
                Err(mpsc::error::SendError(envelope)) => envelope,
            },
            None => envelope,
        };

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                *sender = None;
                return false;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(process_loop(self.inner.name.clone(), rx));
        let sent = tx.send(envelope).is_ok();
        *sender = Some(tx);
        sent
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.inner.name)
            .field("pending", &self.pending())
            .finish()
    }
}

async fn process_loop(name: String, mut rx: mpsc::UnboundedReceiver<Envelope>) {
    debug!(target: "evig::queue", queue = %name, "Processing loop started");
    while let Some(envelope) = rx.recv().await {
        debug!(target: "evig::queue", queue = %name, job = envelope.id, "Job started");
        envelope.run.await;
    }
    debug!(target: "evig::queue", queue = %name, "Processing loop stopped");
}

/// Handle to a queued job
///
/// Awaiting it yields the job's result. Dropping it does not cancel the job.
#[derive(Debug)]
pub struct Job<T> {
    id: u64,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> Job<T> {
    /// Queue-local job id, increasing in submission order
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Future for Job<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::QueueClosed)))
    }
}
