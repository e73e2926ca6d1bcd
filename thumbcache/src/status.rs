//! Service-wide status counters.
//!
//! Counters live for the life of the process and are never reset. They are
//! updated with relaxed atomics and read through [`ServiceStatus::snapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe request and render counters.
///
/// # Example
///
/// ```
/// use thumbcache::status::ServiceStatus;
///
/// let status = ServiceStatus::new();
/// status.record_request();
/// {
///     let _guard = status.enter();
///     assert_eq!(status.snapshot().in_flight, 1);
/// }
/// assert_eq!(status.snapshot().in_flight, 0);
/// ```
#[derive(Debug, Default)]
pub struct ServiceStatus {
    requests_received: AtomicU64,
    in_flight: AtomicU64,
    thumbs_generated: AtomicU64,
    thumbs_failed: AtomicU64,
    claims_abandoned: AtomicU64,
    claims_expired: AtomicU64,
    corrupt_records: AtomicU64,
}

impl ServiceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a request as in flight until the guard is dropped.
    pub fn enter(&self) -> InFlightGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard { status: self }
    }

    pub fn record_generated(&self) {
        self.thumbs_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.thumbs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A claim was released because the render queue was full.
    pub fn record_claim_abandoned(&self) {
        self.claims_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// A queued job was dropped because its claim outlived `claim_ttl`.
    pub fn record_claim_expired(&self) {
        self.claims_expired.fetch_add(1, Ordering::Relaxed);
    }

    /// A stored value failed to decode and was treated as a miss.
    pub fn record_corrupt_record(&self) {
        self.corrupt_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            thumbs_generated: self.thumbs_generated.load(Ordering::Relaxed),
            thumbs_failed: self.thumbs_failed.load(Ordering::Relaxed),
            claims_abandoned: self.claims_abandoned.load(Ordering::Relaxed),
            claims_expired: self.claims_expired.load(Ordering::Relaxed),
            corrupt_records: self.corrupt_records.load(Ordering::Relaxed),
        }
    }
}

/// Decrements the in-flight counter on drop.
#[must_use = "the request stops counting as in flight when the guard is dropped"]
pub struct InFlightGuard<'a> {
    status: &'a ServiceStatus,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.status.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Read-only copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub requests_received: u64,
    pub in_flight: u64,
    pub thumbs_generated: u64,
    pub thumbs_failed: u64,
    pub claims_abandoned: u64,
    pub claims_expired: u64,
    pub corrupt_records: u64,
}
