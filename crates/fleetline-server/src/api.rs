//! HTTP read-surface handlers.
//!
//! Provides:
//! - `GET /latest` — the last record of the most recent batch
//! - `GET /all` — the telemetry log (bounded)
//! - `GET /stats` — pipeline counters
//! - `GET /events/alerts` — SSE real-time stream of anomaly alerts

use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use fleetline_store::{list_records, StoredRecord};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};

/// Handler for `GET /latest`.
///
/// Returns the latest-value cell as a JSON object, or `{}` if no batch has
/// ever completed. Reads never touch the database.
pub async fn get_latest_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<serde_json::Value> {
    match state.latest.get() {
        Some(record) => Json(
            serde_json::to_value(&record).unwrap_or_else(|_| serde_json::json!({})),
        ),
        None => Json(serde_json::json!({})),
    }
}

/// Query parameters for `GET /all`.
#[derive(Debug, Deserialize)]
pub struct AllQuery {
    /// Maximum number of records to return (default: 1000, max: 10000).
    pub limit: Option<i64>,
}

/// Response wrapper for the telemetry log.
#[derive(Debug, Serialize)]
pub struct AllResponse {
    /// Stored records in insertion order.
    pub records: Vec<StoredRecord>,
    /// The number of records returned.
    pub count: usize,
}

/// Handler for `GET /all`.
///
/// Returns the telemetry log in insertion order, bounded by `limit`.
pub async fn get_all_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<AllQuery>,
) -> Result<Json<AllResponse>, Response> {
    let pool = state.pool.clone();
    let limit = params.limit.unwrap_or(1000).clamp(1, 10_000);

    let records = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        list_records(&conn, limit).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("task join error: {}", e) })),
        )
            .into_response()
    })?
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e })),
        )
            .into_response()
    })?;

    let count = records.len();
    Ok(Json(AllResponse { records, count }))
}

/// Handler for `GET /stats`.
///
/// Returns the pipeline's monotonic counters.
pub async fn get_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<fleetline_pipeline::StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Handler for `GET /events/alerts`.
///
/// Streams outbound anomaly alerts via SSE as they are published. Each SSE
/// data frame is one alert payload: the flagged record's fields plus its
/// anomaly flags.
pub async fn get_alert_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.bus.subscribe(&state.alert_topic);

    let stream = futures_util::stream::unfold(subscription, |mut subscription| async move {
        match subscription.recv().await {
            Ok(payload) => {
                let data = String::from_utf8_lossy(&payload).into_owned();
                Some((Ok(Event::default().data(data)), subscription))
            }
            Err(e) => {
                tracing::info!("alert stream closed: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
