//! Bounded render worker pool
//!
//! A fixed number of workers drain a bounded queue of [`RenderJob`]s. Each
//! worker runs one job to completion before taking the next. Submission
//! never blocks: a full queue is reported to the caller, who abandons the
//! claim and serves a placeholder instead of making the request wait.

mod job;
mod slots;
mod worker;

pub use job::{JobHandler, RenderJob};
pub use slots::{WorkerSlots, WorkerSnapshot};
pub use worker::{PoolSnapshot, WorkerPool};

use thiserror::Error;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Why a job could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every queue slot is taken
    #[error("Render queue is full")]
    Full,

    /// The pool has shut down
    #[error("Render pool is shut down")]
    Closed,
}

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Jobs that may wait for a worker
    pub queue_capacity: usize,
}

impl PoolConfig {
    /// One worker per available CPU.
    pub fn default_workers() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
