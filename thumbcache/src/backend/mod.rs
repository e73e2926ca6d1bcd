//! Key/value cache backend
//!
//! The orchestrator only needs four primitives from its store: `get`,
//! `put`, `remove` and an atomic `add_if_absent`. The last one is the only
//! synchronisation point of the claim protocol, so any backend that
//! implements it atomically (in-process map, memcached `add`, redis
//! `SET NX`) can be shared by any number of processes.

mod memory;

pub use memory::MemoryBackend;

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a cache backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The store could not be reached or refused the operation
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Value is larger than the store can ever hold
    #[error("Value for '{key}' is {size} bytes, backend capacity is {capacity} bytes")]
    ValueTooLarge {
        key: String,
        size: usize,
        capacity: usize,
    },
}

/// Point-in-time backend statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    pub gets: u64,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub evictions: u64,
    pub bytes: u64,
    pub items: u64,
    pub capacity_bytes: u64,
}

impl BackendStats {
    /// Hit rate as a fraction (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.hits as f64 / self.gets as f64
        }
    }
}

/// Cache store used by the orchestrator.
///
/// A `ttl` of `None` keeps the entry until the backend evicts it. Expired
/// entries must behave as absent for every operation, including
/// `add_if_absent`.
pub trait Backend: Send + Sync + 'static {
    /// Returns the stored value, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, BackendError>> + Send;

    /// Stores `value`, replacing any existing entry.
    fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Stores `value` only if `key` is absent.
    ///
    /// Returns `true` if this call stored the value, `false` if the key was
    /// already present. Must be atomic with respect to concurrent callers.
    fn add_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Deletes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Returns current statistics.
    fn stats(&self) -> BackendStats;

    /// Returns the backend's name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = BackendStats {
            gets: 4,
            hits: 3,
            misses: 1,
            ..BackendStats::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(BackendStats::default().hit_rate(), 0.0);
    }
}
