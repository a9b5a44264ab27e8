//! Alert fan-out to the outbound topic.

use std::sync::Arc;

use fleetline_scoring::ScoredRecord;

use crate::sink::AlertSink;
use crate::stats::PipelineStats;

/// Publishes flagged records as alert messages.
///
/// Owns one long-lived outbound sink reused across publishes. Each alert
/// payload is a copy of the flagged record with its anomaly flags merged in
/// as boolean fields.
pub struct AlertPublisher {
    sink: Arc<dyn AlertSink>,
    stats: Arc<PipelineStats>,
}

impl AlertPublisher {
    /// Creates a publisher over the given sink.
    pub fn new(sink: Arc<dyn AlertSink>, stats: Arc<PipelineStats>) -> Self {
        Self { sink, stats }
    }

    /// Publishes one message per flagged record.
    ///
    /// Publishes are independent: a serialization or transport failure for
    /// one alert is logged and the remaining alerts are still attempted.
    pub fn publish_all(&self, flagged: &[ScoredRecord]) {
        for scored in flagged {
            let alert = scored.record.with_flags(&scored.flags);

            let payload = match serde_json::to_vec(&alert) {
                Ok(payload) => payload,
                Err(e) => {
                    self.stats.alert_failed();
                    tracing::error!("failed to serialize alert, skipping: {}", e);
                    continue;
                }
            };

            match self.sink.publish(payload) {
                Ok(()) => {
                    self.stats.alert_published();
                    tracing::warn!(
                        flags = ?scored.flags,
                        "anomaly detected, alert published"
                    );
                }
                Err(e) => {
                    self.stats.alert_failed();
                    tracing::error!("failed to publish alert: {}", e);
                }
            }
        }
    }
}
