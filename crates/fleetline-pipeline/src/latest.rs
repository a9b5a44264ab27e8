//! The single-slot latest-value cell.

use std::sync::{Arc, RwLock};

use fleetline_types::TelemetryRecord;

/// Process-wide cell holding the last record of the most recent non-empty
/// batch.
///
/// Single-writer (the accumulator), multiple-reader (the HTTP surface).
/// Uses `std::sync::RwLock` intentionally: all accesses are brief
/// clone/replace operations that never span `.await` points. `None` is the
/// "no batch processed yet" sentinel.
#[derive(Clone, Default)]
pub struct LatestCell {
    inner: Arc<RwLock<Option<TelemetryRecord>>>,
}

impl LatestCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the stored record. Most-recent-write-wins; no history.
    pub fn set(&self, record: TelemetryRecord) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(record);
    }

    /// Returns the current record, or `None` if no batch has ever
    /// completed.
    pub fn get(&self) -> Option<TelemetryRecord> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
