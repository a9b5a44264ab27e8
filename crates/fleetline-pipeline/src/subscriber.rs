//! The inbound subscriber loop.

use std::sync::Arc;

use fleetline_bus::Subscription;
use fleetline_types::TelemetryRecord;

use crate::queue::EventQueue;
use crate::stats::PipelineStats;

/// Consumes the inbound topic until it closes: parse each payload as a
/// telemetry record, enqueue on success, log and discard on failure.
///
/// A malformed message never crashes the loop or blocks other messages —
/// one bad payload costs exactly one discarded message. Parsing happens
/// here, outside the queue's critical section.
pub async fn run_subscriber(
    mut subscription: Subscription,
    queue: Arc<EventQueue>,
    stats: Arc<PipelineStats>,
) {
    tracing::info!(topic = subscription.topic(), "subscriber started");

    loop {
        let payload = match subscription.recv().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::info!("inbound topic closed, subscriber stopping: {}", e);
                return;
            }
        };

        match TelemetryRecord::parse(&payload) {
            Ok(record) => {
                tracing::debug!(fields = record.fields().len(), "received telemetry record");
                queue.enqueue(record);
                stats.record_ingested();
            }
            Err(e) => {
                stats.message_discarded();
                tracing::warn!(
                    payload_len = payload.len(),
                    "discarding malformed inbound message: {}",
                    e
                );
            }
        }
    }
}
