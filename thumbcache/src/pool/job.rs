//! Render jobs and the handler that runs them.

use crate::request::RenderRequest;
use std::future::Future;
use std::time::{Duration, Instant};

/// A claimed key waiting for a worker.
///
/// Created only after a successful claim and consumed exactly once. Jobs
/// are never re-queued.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub request: RenderRequest,
    pub enqueued_at: Instant,
    /// When the backend claim was taken, at or before `enqueued_at`
    pub claimed_at: Instant,
}

impl RenderJob {
    pub fn new(request: RenderRequest) -> Self {
        Self::claimed(request, Instant::now())
    }

    /// A job whose claim was taken at `claimed_at`.
    pub fn claimed(request: RenderRequest, claimed_at: Instant) -> Self {
        Self {
            request,
            enqueued_at: Instant::now(),
            claimed_at,
        }
    }

    pub fn key(&self) -> &str {
        self.request.cache_key()
    }

    /// Time spent waiting in the queue so far.
    pub fn queued_for(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Age of the backend claim, an upper bound on its time in the backend.
    pub fn claim_age(&self) -> Duration {
        self.claimed_at.elapsed()
    }

    /// Whether a claim stored with `claim_ttl` may already have expired.
    /// A `None` TTL never lapses.
    pub fn claim_lapsed(&self, claim_ttl: Option<Duration>) -> bool {
        claim_ttl.is_some_and(|ttl| self.claim_age() >= ttl)
    }
}

/// Runs one job to its terminal store.
///
/// Implementations must not fail: every outcome, success or error, ends in
/// a stored record.
pub trait JobHandler: Send + Sync + 'static {
    fn handle(&self, job: RenderJob) -> impl Future<Output = ()> + Send;
}
