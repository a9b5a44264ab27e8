//! Production bindings for the pipeline's sink seams.

use fleetline_bus::Publisher;
use fleetline_db::DbPool;
use fleetline_pipeline::{AlertSink, BatchSink, SinkError};
use fleetline_types::TelemetryRecord;

/// Persists batches into the SQLite telemetry log.
pub struct SqliteBatchSink {
    pool: DbPool,
}

impl SqliteBatchSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl BatchSink for SqliteBatchSink {
    fn append(&self, batch: &[TelemetryRecord]) -> Result<(), SinkError> {
        let conn = self.pool.get().map_err(SinkError::new)?;
        fleetline_store::append_batch(&conn, batch).map_err(SinkError::new)?;
        Ok(())
    }
}

/// Publishes alert payloads on the outbound bus topic.
///
/// Holds one long-lived [`Publisher`] handle for the topic, reused across
/// every alert.
pub struct BusAlertSink {
    publisher: Publisher,
}

impl BusAlertSink {
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }
}

impl AlertSink for BusAlertSink {
    fn publish(&self, payload: Vec<u8>) -> Result<(), SinkError> {
        let receivers = self.publisher.publish(payload);
        tracing::debug!(
            topic = self.publisher.topic(),
            receivers,
            "alert handed to outbound topic"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_pool() -> DbPool {
        // A single pooled connection: every `:memory:` connection is its own
        // database, so the migrated connection must be the one reused.
        let settings = fleetline_db::DbRuntimeSettings {
            pool_max_size: 1,
            ..Default::default()
        };
        let pool =
            fleetline_db::create_pool(":memory:", settings).expect("pool creation should succeed");
        {
            let conn = pool.get().expect("should get a connection");
            fleetline_db::run_migrations(&conn).expect("migrations should succeed");
        }
        pool
    }

    #[test]
    fn sqlite_sink_appends_through_the_store() {
        let pool = test_pool();
        let sink = SqliteBatchSink::new(pool.clone());

        let record =
            TelemetryRecord::parse(json!({"machine_id": "M1"}).to_string().as_bytes())
                .expect("record should parse");
        sink.append(&[record]).expect("append should succeed");

        let conn = pool.get().expect("should get a connection");
        let count = fleetline_store::record_count(&conn).expect("count should succeed");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn bus_sink_delivers_to_subscribers() {
        let bus = fleetline_bus::TopicBus::default();
        let mut sub = bus.subscribe("machines/alerts");
        let sink = BusAlertSink::new(bus.publisher("machines/alerts"));

        sink.publish(b"alert-payload".to_vec())
            .expect("publish should succeed");

        let payload = sub.recv().await.expect("recv should succeed");
        assert_eq!(payload, b"alert-payload");
    }
}
