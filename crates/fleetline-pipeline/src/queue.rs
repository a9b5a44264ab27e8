//! The event queue between the subscriber and the accumulator.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use fleetline_types::TelemetryRecord;

/// Capacity behaviour for the event queue.
///
/// The queue is unbounded by default, trading memory growth under sustained
/// overload for guaranteed non-blocking ingestion. Bounded policies make
/// that tradeoff a configuration decision: when the queue is full,
/// `DropOldest` sheds the head (keep the freshest telemetry), `DropNewest`
/// sheds the incoming record (keep the backlog intact). There is no
/// blocking policy — `enqueue` must never block the subscriber loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// No capacity limit.
    Unbounded,
    /// At capacity, evict the oldest queued record to admit the new one.
    DropOldest {
        /// Maximum queued records.
        capacity: usize,
    },
    /// At capacity, discard the incoming record.
    DropNewest {
        /// Maximum queued records.
        capacity: usize,
    },
}

/// A thread-safe FIFO buffer of telemetry records.
///
/// `enqueue` and `drain_all` may race freely: the drain atomically snapshots
/// and empties the queue under the lock, so every record enqueued before the
/// snapshot point lands in that batch and every record enqueued after lands
/// in a later one — nothing is lost or duplicated. Both operations hold the
/// lock only for brief memory work; no I/O or parsing happens inside the
/// critical section.
pub struct EventQueue {
    inner: Mutex<VecDeque<TelemetryRecord>>,
    policy: QueuePolicy,
    dropped: AtomicU64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(QueuePolicy::Unbounded)
    }
}

impl EventQueue {
    /// Creates a queue with the given capacity policy.
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends a record. Never blocks beyond the brief internal lock and
    /// never fails; under a bounded policy a full queue sheds one record
    /// according to the policy.
    pub fn enqueue(&self, record: TelemetryRecord) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.policy {
            QueuePolicy::Unbounded => inner.push_back(record),
            QueuePolicy::DropOldest { capacity } => {
                if inner.len() >= capacity {
                    inner.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                inner.push_back(record);
            }
            QueuePolicy::DropNewest { capacity } => {
                if inner.len() >= capacity {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                } else {
                    inner.push_back(record);
                }
            }
        }
    }

    /// Atomically removes and returns every queued record in arrival order,
    /// leaving the queue empty. Safe to call concurrently with ongoing
    /// `enqueue` calls; records enqueued after the snapshot belong to the
    /// next batch.
    pub fn drain_all(&self) -> Vec<TelemetryRecord> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *inner).into()
    }

    /// Current number of queued records.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// True when no records are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records shed by a bounded policy over the queue's lifetime.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn record(i: usize) -> TelemetryRecord {
        TelemetryRecord::parse(json!({"seq": i}).to_string().as_bytes())
            .expect("record should parse")
    }

    #[test]
    fn drain_returns_records_in_arrival_order() {
        let queue = EventQueue::default();
        for i in 0..5 {
            queue.enqueue(record(i));
        }

        let batch = queue.drain_all();
        assert_eq!(batch.len(), 5);
        for (i, rec) in batch.iter().enumerate() {
            assert_eq!(rec.number("seq"), Some(i as f64));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_is_idempotent() {
        let queue = EventQueue::default();
        assert!(queue.drain_all().is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn enqueue_after_drain_lands_in_next_batch() {
        let queue = EventQueue::default();
        queue.enqueue(record(0));

        let first = queue.drain_all();
        queue.enqueue(record(1));
        let second = queue.drain_all();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].number("seq"), Some(0.0));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].number("seq"), Some(1.0));
    }

    #[test]
    fn drop_oldest_policy_keeps_freshest_records() {
        let queue = EventQueue::new(QueuePolicy::DropOldest { capacity: 3 });
        for i in 0..5 {
            queue.enqueue(record(i));
        }

        let batch = queue.drain_all();
        let seqs: Vec<_> = batch.iter().map(|r| r.number("seq").unwrap()).collect();
        assert_eq!(seqs, vec![2.0, 3.0, 4.0]);
        assert_eq!(queue.dropped(), 2);
    }

    #[test]
    fn drop_newest_policy_keeps_backlog() {
        let queue = EventQueue::new(QueuePolicy::DropNewest { capacity: 3 });
        for i in 0..5 {
            queue.enqueue(record(i));
        }

        let batch = queue.drain_all();
        let seqs: Vec<_> = batch.iter().map(|r| r.number("seq").unwrap()).collect();
        assert_eq!(seqs, vec![0.0, 1.0, 2.0]);
        assert_eq!(queue.dropped(), 2);
    }

    #[test]
    fn concurrent_enqueue_and_drain_loses_nothing() {
        let queue = Arc::new(EventQueue::default());
        let total = 1_000usize;

        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                for i in 0..total {
                    queue.enqueue(record(i));
                }
            })
        };

        let mut drained = Vec::new();
        while drained.len() < total {
            drained.extend(queue.drain_all());
        }
        producer.join().expect("producer thread should finish");

        // Every record appears exactly once, in arrival order.
        assert_eq!(drained.len(), total);
        for (i, rec) in drained.iter().enumerate() {
            assert_eq!(rec.number("seq"), Some(i as f64));
        }
    }
}
