//! Per-worker activity slots for observability.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone)]
enum SlotState {
    Idle,
    Busy {
        key: String,
        url: String,
        started: Instant,
    },
}

/// What one worker is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSnapshot {
    pub worker: usize,
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// Fixed array of worker states, one mutex per slot.
///
/// Only written by the owning worker; readers take a snapshot. Nothing in
/// the claim protocol depends on it.
#[derive(Debug)]
pub struct WorkerSlots {
    slots: Box<[Mutex<SlotState>]>,
}

impl WorkerSlots {
    pub fn new(workers: usize) -> Self {
        Self {
            slots: (0..workers).map(|_| Mutex::new(SlotState::Idle)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn start(&self, worker: usize, key: &str, url: &str) {
        if let Some(slot) = self.slots.get(worker) {
            *slot.lock() = SlotState::Busy {
                key: key.to_string(),
                url: url.to_string(),
                started: Instant::now(),
            };
        }
    }

    pub(crate) fn finish(&self, worker: usize) {
        if let Some(slot) = self.slots.get(worker) {
            *slot.lock() = SlotState::Idle;
        }
    }

    /// Number of workers currently running a job.
    pub fn busy(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(*slot.lock(), SlotState::Busy { .. }))
            .count()
    }

    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.slots
            .iter()
            .enumerate()
            .map(|(worker, slot)| match &*slot.lock() {
                SlotState::Idle => WorkerSnapshot {
                    worker,
                    busy: false,
                    key: None,
                    url: None,
                    elapsed_ms: None,
                },
                SlotState::Busy { key, url, started } => WorkerSnapshot {
                    worker,
                    busy: true,
                    key: Some(key.clone()),
                    url: Some(url.clone()),
                    elapsed_ms: Some(started.elapsed().as_millis() as u64),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_start_idle() {
        let slots = WorkerSlots::new(3);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots.busy(), 0);
        assert!(slots.snapshot().iter().all(|s| !s.busy));
    }

    #[test]
    fn test_start_and_finish() {
        let slots = WorkerSlots::new(2);
        slots.start(1, "fit-in-1x1-abc", "example.com/a.png");

        let snapshot = slots.snapshot();
        assert!(!snapshot[0].busy);
        assert!(snapshot[1].busy);
        assert_eq!(snapshot[1].key.as_deref(), Some("fit-in-1x1-abc"));
        assert_eq!(snapshot[1].url.as_deref(), Some("example.com/a.png"));
        assert_eq!(slots.busy(), 1);

        slots.finish(1);
        assert_eq!(slots.busy(), 0);
    }

    #[test]
    fn test_out_of_range_worker_is_ignored() {
        let slots = WorkerSlots::new(1);
        slots.start(5, "k", "u");
        assert_eq!(slots.busy(), 0);
    }

    #[test]
    fn test_idle_snapshot_omits_job_fields() {
        let json = serde_json::to_value(&WorkerSlots::new(1).snapshot()[0]).unwrap();
        assert_eq!(json["busy"], false);
        assert!(json.get("key").is_none());
    }
}
