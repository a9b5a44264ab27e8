//! Fleetline server library logic: application state, router, and the
//! pieces that wire the pipeline to its collaborators.

pub mod api;
pub mod config;
pub mod simulator;
pub mod sinks;

use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fleetline_bus::TopicBus;
use fleetline_db::DbPool;
use fleetline_pipeline::{LatestCell, PipelineStats};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// The pipeline's latest-value cell (read-only here; the accumulator is
    /// the sole writer).
    pub latest: LatestCell,
    /// Pipeline counters.
    pub stats: Arc<PipelineStats>,
    /// The pub/sub bus, for subscribing the SSE surface to alerts.
    pub bus: TopicBus,
    /// The outbound alert topic name.
    pub alert_topic: String,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/latest", get(api::get_latest_handler))
        .route("/all", get(api::get_all_handler))
        .route("/stats", get(api::get_stats_handler))
        .route("/events/alerts", get(api::get_alert_stream_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use fleetline_types::TelemetryRecord;

    fn test_state() -> AppState {
        // A single pooled connection: every `:memory:` connection is its own
        // database, so the migrated connection must be the one reused.
        let settings = fleetline_db::DbRuntimeSettings {
            pool_max_size: 1,
            ..Default::default()
        };
        let pool = fleetline_db::create_pool(":memory:", settings)
            .expect("pool creation should succeed");
        {
            let conn = pool.get().expect("should get a connection");
            fleetline_db::run_migrations(&conn).expect("migrations should succeed");
        }

        AppState {
            pool,
            latest: LatestCell::new(),
            stats: Arc::new(PipelineStats::default()),
            bus: TopicBus::default(),
            alert_topic: "machines/alerts".to_string(),
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let (status, body) = get_json(app(test_state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn latest_returns_empty_object_before_any_batch() {
        let (status, body) = get_json(app(test_state()), "/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn latest_returns_the_cell_contents() {
        let state = test_state();
        let record = TelemetryRecord::parse(
            json!({"machine_id": "M1", "Fuel Used (L)": 24.5})
                .to_string()
                .as_bytes(),
        )
        .expect("record should parse");
        state.latest.set(record);

        let (status, body) = get_json(app(state), "/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["machine_id"], "M1");
        assert_eq!(body["Fuel Used (L)"], 24.5);
    }

    #[tokio::test]
    async fn all_returns_stored_records() {
        let state = test_state();
        {
            let conn = state.pool.get().expect("should get a connection");
            let record = TelemetryRecord::parse(
                json!({"machine_id": "M1"}).to_string().as_bytes(),
            )
            .expect("record should parse");
            fleetline_store::append_batch(&conn, &[record]).expect("append should succeed");
        }

        let (status, body) = get_json(app(state), "/all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["records"][0]["record"]["machine_id"], "M1");
    }

    #[tokio::test]
    async fn stats_returns_counters() {
        let state = test_state();
        state.stats.record_ingested();

        let (status, body) = get_json(app(state), "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records_ingested"], 1);
        assert_eq!(body["batches_processed"], 0);
    }
}
