//! In-memory backend with LRU eviction and per-entry TTL.

use super::{Backend, BackendError, BackendStats};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Default memory budget (256 MB).
pub const DEFAULT_MEMORY_SIZE: usize = 256 * 1024 * 1024;

#[derive(Debug)]
struct Entry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
    /// Recency tick; the smallest tick is evicted first
    tick: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Recency order: tick -> key
    order: BTreeMap<u64, String>,
    next_tick: u64,
    bytes: usize,
}

impl State {
    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn touch(&mut self, key: &str) {
        let tick = self.bump();
        if let Some(entry) = self.entries.get_mut(key) {
            self.order.remove(&entry.tick);
            entry.tick = tick;
            self.order.insert(tick, key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.tick);
        self.bytes -= entry.data.len();
        Some(entry)
    }

    /// Removes `key` if it has expired. Returns true if a live entry remains.
    fn live(&mut self, key: &str, now: Instant) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn insert(&mut self, key: &str, data: Vec<u8>, expires_at: Option<Instant>) {
        self.remove(key);
        let tick = self.bump();
        self.bytes += data.len();
        self.order.insert(tick, key.to_string());
        self.entries.insert(
            key.to_string(),
            Entry {
                data,
                expires_at,
                tick,
            },
        );
    }

    /// Evicts least recently used entries until `incoming` more bytes fit.
    fn make_room(&mut self, incoming: usize, capacity: usize) -> u64 {
        let mut evicted = 0;
        while self.bytes + incoming > capacity {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.bytes -= entry.data.len();
                evicted += 1;
                trace!(key = %key, size = entry.data.len(), "Evicted cache entry");
            }
        }
        evicted
    }
}

/// Process-local [`Backend`].
///
/// All operations take one mutex, so `add_if_absent` is trivially atomic.
/// Values count against `capacity` by their length; when a store would
/// exceed it, least recently used entries are evicted first.
pub struct MemoryBackend {
    state: Mutex<State>,
    capacity: usize,
    gets: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryBackend {
    /// Creates a backend holding at most `capacity` bytes of values.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            capacity,
            gets: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_size(&self, key: &str, size: usize) -> Result<(), BackendError> {
        if size > self.capacity {
            return Err(BackendError::ValueTooLarge {
                key: key.to_string(),
                size,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn store(&self, state: &mut State, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        // The old value is being replaced; it must not count against the new one.
        state.remove(key);
        let evicted = state.make_room(value.len(), self.capacity);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        state.insert(key, value, ttl.map(|ttl| Instant::now() + ttl));
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    fn get_sync(&self, key: &str) -> Option<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();

        if !state.live(key, Instant::now()) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        state.touch(key);
        self.hits.fetch_add(1, Ordering::Relaxed);
        state.entries.get(key).map(|entry| entry.data.clone())
    }

    fn put_sync(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), BackendError> {
        self.check_size(key, value.len())?;
        let mut state = self.state.lock();
        self.store(&mut state, key, value, ttl);
        Ok(())
    }

    fn add_if_absent_sync(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        self.check_size(key, value.len())?;
        let mut state = self.state.lock();
        if state.live(key, Instant::now()) {
            return Ok(false);
        }
        self.store(&mut state, key, value, ttl);
        Ok(true)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.get_sync(key))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), BackendError> {
        self.put_sync(key, value, ttl)
    }

    async fn add_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        self.add_if_absent_sync(key, value, ttl)
    }

    async fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.state.lock().remove(key);
        Ok(())
    }

    fn stats(&self) -> BackendStats {
        let (bytes, items) = {
            let state = self.state.lock();
            (state.bytes as u64, state.entries.len() as u64)
        };
        BackendStats {
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            bytes,
            items,
            capacity_bytes: self.capacity as u64,
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_put() {
        let backend = MemoryBackend::new(1024);
        assert_eq!(backend.get("a").await.unwrap(), None);

        backend.put("a", vec![1, 2, 3], None).await.unwrap();
        assert_eq!(backend.get("a").await.unwrap(), Some(vec![1, 2, 3]));

        let stats = backend.stats();
        assert_eq!((stats.gets, stats.hits, stats.misses), (2, 1, 1));
        assert_eq!((stats.bytes, stats.items, stats.puts), (3, 1, 1));
    }

    #[tokio::test]
    async fn test_put_overwrites_and_reaccounts_bytes() {
        let backend = MemoryBackend::new(1024);
        backend.put("a", vec![0; 100], None).await.unwrap();
        backend.put("a", vec![0; 10], None).await.unwrap();
        assert_eq!(backend.stats().bytes, 10);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_add_if_absent() {
        let backend = MemoryBackend::new(1024);
        assert!(backend.add_if_absent("k", vec![1], None).await.unwrap());
        assert!(!backend.add_if_absent("k", vec![2], None).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_remove() {
        let backend = MemoryBackend::new(1024);
        backend.put("k", vec![1, 2], None).await.unwrap();
        backend.remove("k").await.unwrap();
        backend.remove("missing").await.unwrap();
        assert!(backend.is_empty());
        assert_eq!(backend.stats().bytes, 0);
        assert!(backend.add_if_absent("k", vec![3], None).await.unwrap());
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let backend = MemoryBackend::new(30);
        backend.put("a", vec![0; 10], None).await.unwrap();
        backend.put("b", vec![0; 10], None).await.unwrap();
        backend.put("c", vec![0; 10], None).await.unwrap();

        // Touch "a" so "b" becomes the oldest
        backend.get("a").await.unwrap();
        backend.put("d", vec![0; 10], None).await.unwrap();

        assert!(backend.get("a").await.unwrap().is_some());
        assert!(backend.get("b").await.unwrap().is_none());
        assert!(backend.get("c").await.unwrap().is_some());
        assert!(backend.get("d").await.unwrap().is_some());
        assert_eq!(backend.stats().evictions, 1);
        assert_eq!(backend.stats().bytes, 30);
    }

    #[tokio::test]
    async fn test_value_larger_than_capacity() {
        let backend = MemoryBackend::new(8);
        let err = backend.put("k", vec![0; 9], None).await.unwrap_err();
        assert!(matches!(err, BackendError::ValueTooLarge { size: 9, .. }));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let backend = MemoryBackend::new(1024);
        backend
            .put("k", vec![1], Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(backend.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(backend.get("k").await.unwrap().is_none());
        assert_eq!(backend.stats().bytes, 0);
    }

    #[tokio::test]
    async fn test_expired_claim_can_be_reclaimed() {
        let backend = MemoryBackend::new(1024);
        assert!(backend
            .add_if_absent("k", vec![1], Some(Duration::from_millis(20)))
            .await
            .unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(backend.add_if_absent("k", vec![2], None).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), Some(vec![2]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_add_if_absent_is_exclusive_under_contention() {
        let backend = Arc::new(MemoryBackend::new(1 << 20));
        let mut handles = Vec::new();
        for i in 0..64u8 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                backend.add_if_absent("contended", vec![i], None).await.unwrap()
            }));
        }

        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap() {
                stored += 1;
            }
        }
        assert_eq!(stored, 1);
    }
}
