//! Worker tasks and the submission side of the queue.

use super::job::{JobHandler, RenderJob};
use super::slots::{WorkerSlots, WorkerSnapshot};
use super::{PoolConfig, PoolError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Queue and worker state for `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub queued: usize,
    pub queue_capacity: usize,
    pub busy: usize,
    pub workers: Vec<WorkerSnapshot>,
}

/// Fixed set of render workers behind a bounded queue.
///
/// # Lifecycle
///
/// 1. **Creation**: `start()` creates the queue and spawns `W` workers
/// 2. **Operation**: callers `try_submit()` claimed jobs
/// 3. **Shutdown**: `shutdown()` stops intake; workers finish their current
///    job and exit
pub struct WorkerPool {
    sender: mpsc::Sender<RenderJob>,
    slots: Arc<WorkerSlots>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown_token: CancellationToken,
}

impl WorkerPool {
    /// Spawns the workers. Must be called inside a tokio runtime.
    ///
    /// Zero workers or a zero-capacity queue are raised to one.
    pub fn start<H: JobHandler>(handler: Arc<H>, config: PoolConfig) -> Self {
        let workers = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);

        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let slots = Arc::new(WorkerSlots::new(workers));
        let shutdown_token = CancellationToken::new();

        let handles = (0..workers)
            .map(|id| {
                let handler = Arc::clone(&handler);
                let receiver = Arc::clone(&receiver);
                let slots = Arc::clone(&slots);
                let shutdown = shutdown_token.clone();
                tokio::spawn(async move {
                    run_worker(id, handler, receiver, slots, shutdown).await;
                })
            })
            .collect();

        info!(workers, queue_capacity = capacity, "Render worker pool started");

        Self {
            sender,
            slots,
            handles: Mutex::new(handles),
            shutdown_token,
        }
    }

    /// Queues a job without waiting.
    pub fn try_submit(&self, job: RenderJob) -> Result<(), PoolError> {
        if self.shutdown_token.is_cancelled() {
            return Err(PoolError::Closed);
        }
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => PoolError::Full,
            TrySendError::Closed(_) => PoolError::Closed,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn slots(&self) -> &WorkerSlots {
        &self.slots
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            queued: self.queued(),
            queue_capacity: self.queue_capacity(),
            busy: self.slots.busy(),
            workers: self.slots.snapshot(),
        }
    }

    /// Stops intake and waits for every worker to finish its current job.
    ///
    /// Jobs still queued are dropped; their claims expire in the backend.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());

        let dropped = self.queued();
        if dropped > 0 {
            info!(dropped, "Dropping queued render jobs on shutdown");
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Render worker panicked");
            }
        }
        info!("Render worker pool stopped");
    }
}

async fn run_worker<H: JobHandler>(
    id: usize,
    handler: Arc<H>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<RenderJob>>>,
    slots: Arc<WorkerSlots>,
    shutdown: CancellationToken,
) {
    debug!(worker = id, "Render worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = async { receiver.lock().await.recv().await } => match job {
                Some(job) => job,
                None => break,
            },
        };

        debug!(
            worker = id,
            key = job.key(),
            queued_ms = job.queued_for().as_millis() as u64,
            "Render job started"
        );
        slots.start(id, job.key(), job.request.source_url());
        handler.handle(job).await;
        slots.finish(id);
    }

    debug!(worker = id, "Render worker stopped");
}
