//! Pipeline counters surfaced by the read surface.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters for pipeline activity.
///
/// Shared by the subscriber, accumulator, and alert publisher; read by the
/// `/stats` endpoint. All updates are relaxed — the counters are
/// informational, not synchronization.
#[derive(Debug, Default)]
pub struct PipelineStats {
    messages_discarded: AtomicU64,
    records_ingested: AtomicU64,
    batches_processed: AtomicU64,
    records_persisted: AtomicU64,
    records_lost: AtomicU64,
    records_unscorable: AtomicU64,
    alerts_published: AtomicU64,
    alerts_failed: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    /// Inbound messages dropped as malformed.
    pub messages_discarded: u64,
    /// Records parsed and enqueued.
    pub records_ingested: u64,
    /// Non-empty batches processed.
    pub batches_processed: u64,
    /// Records durably appended.
    pub records_persisted: u64,
    /// Records in batches whose append failed.
    pub records_lost: u64,
    /// Records skipped by the scorer for missing required features.
    pub records_unscorable: u64,
    /// Alerts delivered to the outbound topic.
    pub alerts_published: u64,
    /// Alerts that failed to publish.
    pub alerts_failed: u64,
}

impl PipelineStats {
    pub fn message_discarded(&self) {
        self.messages_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingested(&self) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_processed(&self) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_persisted(&self, count: u64) {
        self.records_persisted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn records_lost(&self, count: u64) {
        self.records_lost.fetch_add(count, Ordering::Relaxed);
    }

    pub fn records_unscorable(&self, count: u64) {
        self.records_unscorable.fetch_add(count, Ordering::Relaxed);
    }

    pub fn alert_published(&self) {
        self.alerts_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn alert_failed(&self) {
        self.alerts_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_discarded: self.messages_discarded.load(Ordering::Relaxed),
            records_ingested: self.records_ingested.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            records_lost: self.records_lost.load(Ordering::Relaxed),
            records_unscorable: self.records_unscorable.load(Ordering::Relaxed),
            alerts_published: self.alerts_published.load(Ordering::Relaxed),
            alerts_failed: self.alerts_failed.load(Ordering::Relaxed),
        }
    }
}
