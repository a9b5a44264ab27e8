//! Unit tests for the telemetry log.

use rusqlite::Connection;
use serde_json::json;

use fleetline_types::TelemetryRecord;

use crate::error::StoreError;
use crate::log::{append_batch, latest_record, list_records, record_count};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    fleetline_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn record(value: serde_json::Value) -> TelemetryRecord {
    TelemetryRecord::parse(value.to_string().as_bytes()).expect("record should parse")
}

// ── append_batch tests ───────────────────────────────────────────────

#[test]
fn append_batch_inserts_all_records() {
    let conn = test_db();

    let batch = vec![
        record(json!({"machine_id": "M1", "Fuel Used (L)": 24.5})),
        record(json!({"machine_id": "M2", "Fuel Used (L)": 31.0})),
        record(json!({"machine_id": "M3", "Fuel Used (L)": 19.2})),
    ];

    let batch_id = append_batch(&conn, &batch).expect("append should succeed");
    assert_eq!(batch_id, 1);
    assert_eq!(record_count(&conn).expect("count should succeed"), 3);
}

#[test]
fn append_batch_rejects_empty_batch() {
    let conn = test_db();
    assert!(matches!(
        append_batch(&conn, &[]),
        Err(StoreError::EmptyBatch)
    ));
    assert_eq!(record_count(&conn).expect("count should succeed"), 0);
}

#[test]
fn batch_ids_are_monotonic() {
    let conn = test_db();

    let first = vec![record(json!({"machine_id": "M1"}))];
    let second = vec![record(json!({"machine_id": "M2"}))];

    let id1 = append_batch(&conn, &first).expect("first append should succeed");
    let id2 = append_batch(&conn, &second).expect("second append should succeed");

    assert_eq!(id1, 1);
    assert_eq!(id2, 2);
}

// ── read query tests ─────────────────────────────────────────────────

#[test]
fn list_records_returns_insertion_order() {
    let conn = test_db();

    let batch = vec![
        record(json!({"machine_id": "M1", "Load Cycles": 140.0})),
        record(json!({"machine_id": "M2", "Load Cycles": 151.0})),
    ];
    append_batch(&conn, &batch).expect("append should succeed");

    let stored = list_records(&conn, 100).expect("list should succeed");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].record, batch[0]);
    assert_eq!(stored[1].record, batch[1]);
    assert_eq!(stored[0].batch_id, stored[1].batch_id);
}

#[test]
fn list_records_respects_limit() {
    let conn = test_db();

    let batch: Vec<_> = (0..5)
        .map(|i| record(json!({"machine_id": format!("M{i}")})))
        .collect();
    append_batch(&conn, &batch).expect("append should succeed");

    let stored = list_records(&conn, 2).expect("list should succeed");
    assert_eq!(stored.len(), 2);
}

#[test]
fn latest_record_on_empty_log_is_none() {
    let conn = test_db();
    let latest = latest_record(&conn).expect("query should succeed");
    assert!(latest.is_none());
}

#[test]
fn latest_record_is_last_appended() {
    let conn = test_db();

    append_batch(&conn, &[record(json!({"machine_id": "M1"}))]).expect("append should succeed");
    append_batch(
        &conn,
        &[
            record(json!({"machine_id": "M2"})),
            record(json!({"machine_id": "M3"})),
        ],
    )
    .expect("append should succeed");

    let latest = latest_record(&conn)
        .expect("query should succeed")
        .expect("log should not be empty");
    assert_eq!(latest.record.get("machine_id"), Some(&json!("M3")));
    assert_eq!(latest.batch_id, 2);
}

// ── round-trip tests ─────────────────────────────────────────────────

#[test]
fn stored_record_round_trips_field_for_field() {
    let conn = test_db();

    let original = record(json!({
        "Fuel Used (L)": 5.0,
        "Engine Hours": 10.0,
        "machine_id": "MACHINE_003",
        "Safety Alert": true,
    }));
    append_batch(&conn, std::slice::from_ref(&original)).expect("append should succeed");

    let stored = latest_record(&conn)
        .expect("query should succeed")
        .expect("log should not be empty");

    assert_eq!(stored.record, original);
    assert_eq!(stored.record.number("Fuel Used (L)"), Some(5.0));
    assert_eq!(stored.record.number("Engine Hours"), Some(10.0));
}
