//! The timer-driven batch accumulator.

use std::sync::Arc;
use std::time::Duration;

use fleetline_scoring::Scorer;

use crate::alert::AlertPublisher;
use crate::latest::LatestCell;
use crate::queue::EventQueue;
use crate::sink::BatchSink;
use crate::stats::PipelineStats;

/// Drains the event queue on a fixed interval and dispatches each
/// non-empty batch downstream.
///
/// Per tick: drain atomically; if empty, do nothing at all (no persistence
/// call, no scoring call, no cache update). Otherwise persist and score the
/// same immutable snapshot — independently, so a persistence failure never
/// suppresses alerts and vice versa — then overwrite the latest-value cell
/// with the batch's last record.
pub struct Accumulator {
    queue: Arc<EventQueue>,
    batch_sink: Arc<dyn BatchSink>,
    scorer: Arc<Scorer>,
    alerts: AlertPublisher,
    latest: LatestCell,
    stats: Arc<PipelineStats>,
    flush_interval: Duration,
}

impl Accumulator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<EventQueue>,
        batch_sink: Arc<dyn BatchSink>,
        scorer: Arc<Scorer>,
        alerts: AlertPublisher,
        latest: LatestCell,
        stats: Arc<PipelineStats>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            queue,
            batch_sink,
            scorer,
            alerts,
            latest,
            stats,
            flush_interval,
        }
    }

    /// Runs the accumulator loop indefinitely.
    ///
    /// Each tick executes in its own task so that nothing a tick does — not
    /// even a panic in a sink or the scorer — can stop future ticks from
    /// firing on schedule.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            flush_interval_secs = self.flush_interval.as_secs_f64(),
            "batch accumulator started"
        );

        let start = tokio::time::Instant::now() + self.flush_interval;
        let mut interval = tokio::time::interval_at(start, self.flush_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let this = self.clone();
            if let Err(e) = tokio::spawn(async move { this.tick().await }).await {
                tracing::error!("accumulator tick panicked, continuing: {}", e);
            }
        }
    }

    /// Executes one accumulation cycle.
    pub async fn tick(&self) {
        let batch = self.queue.drain_all();
        if batch.is_empty() {
            // An empty tick is indistinguishable from no tick.
            return;
        }

        self.stats.batch_processed();
        tracing::info!(count = batch.len(), "processing telemetry batch");

        self.persist(&batch).await;
        self.score_and_alert(&batch);

        if let Some(last) = batch.last() {
            self.latest.set(last.clone());
        }
    }

    /// Hands the batch to the persistence sink off the async runtime.
    ///
    /// On failure the batch is counted lost for durability and the tick
    /// continues; retry policy, if any, belongs to the sink.
    async fn persist(&self, batch: &[fleetline_types::TelemetryRecord]) {
        let sink = self.batch_sink.clone();
        let owned = batch.to_vec();
        let count = owned.len() as u64;

        let res = tokio::task::spawn_blocking(move || sink.append(&owned)).await;

        match res {
            Ok(Ok(())) => {
                self.stats.records_persisted(count);
                tracing::info!(count, "persisted telemetry batch");
            }
            Ok(Err(e)) => {
                self.stats.records_lost(count);
                tracing::error!(count, "failed to persist batch, records lost: {}", e);
            }
            Err(e) => {
                self.stats.records_lost(count);
                tracing::error!(count, "persistence task join error, records lost: {}", e);
            }
        }
    }

    /// Scores the batch and fans out alerts for the flagged subset.
    fn score_and_alert(&self, batch: &[fleetline_types::TelemetryRecord]) {
        let outcome = self.scorer.score(batch);

        if outcome.unscorable > 0 {
            self.stats.records_unscorable(outcome.unscorable as u64);
            tracing::debug!(
                count = outcome.unscorable,
                "records skipped as unscorable"
            );
        }

        if !outcome.flagged.is_empty() {
            self.alerts.publish_all(&outcome.flagged);
        }
    }
}
