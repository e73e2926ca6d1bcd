//! In-process render coalescing for inline mode.
//!
//! The backend claim already guarantees one render per key across
//! processes. Inside one process, requests that arrive while a render is
//! running subscribe to its result instead of being turned away with a
//! placeholder.
//!
//! ```text
//! Request A ─┐                       claim + spawn
//! Request B ─┼──► RenderCoalescer ─────────────────► render task
//! Request C ─┘          ▲                                │
//!                       └──── broadcast result ◄─────────┘
//! ```

use crate::codec::ThumbRecord;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Result shared with every waiter.
pub type SharedRecord = Arc<ThumbRecord>;

/// Outcome of [`RenderCoalescer::register`].
pub enum Registration {
    /// First request for the key: the caller must claim and render, then
    /// hand the result to the ticket.
    Leader {
        ticket: LeaderTicket,
        receiver: broadcast::Receiver<SharedRecord>,
    },
    /// A render for the key is already running here.
    Follower(broadcast::Receiver<SharedRecord>),
}

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CoalescerStats {
    pub leaders: u64,
    pub followers: u64,
    pub in_flight: u64,
}

/// Tracks keys being rendered by this process.
#[derive(Default)]
pub struct RenderCoalescer {
    in_flight: DashMap<String, broadcast::Sender<SharedRecord>>,
    leaders: AtomicU64,
    followers: AtomicU64,
}

impl RenderCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `key`.
    ///
    /// Uses the map's entry API so two callers can never both become leader.
    pub fn register(self: &Arc<Self>, key: &str) -> Registration {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                self.followers.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Waiting on in-process render");
                Registration::Follower(entry.get().subscribe())
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = broadcast::channel(1);
                entry.insert(sender);
                self.leaders.fetch_add(1, Ordering::Relaxed);
                Registration::Leader {
                    ticket: LeaderTicket {
                        coalescer: Arc::clone(self),
                        key: key.to_string(),
                        done: false,
                    },
                    receiver,
                }
            }
        }
    }

    /// Number of keys currently being rendered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            leaders: self.leaders.load(Ordering::Relaxed),
            followers: self.followers.load(Ordering::Relaxed),
            in_flight: self.in_flight.len() as u64,
        }
    }

    fn finish(&self, key: &str, record: Option<SharedRecord>) {
        if let Some((_, sender)) = self.in_flight.remove(key) {
            let waiters = sender.receiver_count();
            match record {
                Some(record) => {
                    // Receivers may all be gone already
                    let _ = sender.send(record);
                    debug!(key, waiters, "Broadcast render result");
                }
                None => debug!(key, waiters, "Abandoned in-process render"),
            }
        }
    }
}

/// Leadership of one key.
///
/// Dropping the ticket without calling [`complete`](Self::complete)
/// removes the key and wakes every waiter with a closed channel.
pub struct LeaderTicket {
    coalescer: Arc<RenderCoalescer>,
    key: String,
    done: bool,
}

impl LeaderTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Publishes the result to all waiters.
    pub fn complete(mut self, record: SharedRecord) {
        self.done = true;
        self.coalescer.finish(&self.key, Some(record));
    }
}

impl Drop for LeaderTicket {
    fn drop(&mut self) {
        if !self.done {
            self.coalescer.finish(&self.key, None);
        }
    }
}
