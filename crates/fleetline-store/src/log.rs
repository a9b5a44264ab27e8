//! Persistence operations for the telemetry log.
//!
//! All writes go through [`append_batch`], which serialises each record and
//! inserts the whole batch in a single transaction under one batch id.
//! Reads go through [`list_records`] and [`latest_record`].

use rusqlite::{params, Connection};

use fleetline_types::TelemetryRecord;

use crate::error::StoreError;

/// A single row from the `machine_logs` table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredRecord {
    /// Auto-incremented row ID.
    pub id: i64,
    /// The batch this record was appended with.
    pub batch_id: i64,
    /// The telemetry record as received.
    pub record: TelemetryRecord,
    /// ISO 8601 timestamp of when the batch was persisted.
    pub received_at: String,
}

/// Appends a batch of telemetry records to the log.
///
/// The batch id is assigned automatically: one greater than the highest
/// batch id in the table, computed inside the same transaction as the
/// inserts so concurrent appenders cannot collide. Returns the assigned
/// batch id.
///
/// # Errors
///
/// Returns [`StoreError::EmptyBatch`] for an empty slice,
/// [`StoreError::Serialization`] if a record cannot be serialised, and
/// [`StoreError::Database`] on SQL failure. On any error the transaction is
/// rolled back and no records from the batch are persisted.
pub fn append_batch(conn: &Connection, batch: &[TelemetryRecord]) -> Result<i64, StoreError> {
    if batch.is_empty() {
        return Err(StoreError::EmptyBatch);
    }

    let tx = conn.unchecked_transaction()?;

    let batch_id: i64 = tx.query_row(
        "SELECT COALESCE(MAX(batch_id), 0) + 1 FROM machine_logs",
        [],
        |row| row.get(0),
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO machine_logs (batch_id, record_json, received_at)
             VALUES (?1, ?2, datetime('now'))",
        )?;
        for record in batch {
            let record_json = serde_json::to_string(record)?;
            stmt.execute(params![batch_id, record_json])?;
        }
    }

    tx.commit()?;

    tracing::debug!(batch_id, count = batch.len(), "appended telemetry batch");

    Ok(batch_id)
}

/// Lists records from the log in insertion order (oldest first), bounded by
/// `limit`.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQL failure or
/// [`StoreError::Serialization`] if a stored record no longer parses.
pub fn list_records(conn: &Connection, limit: i64) -> Result<Vec<StoredRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, batch_id, record_json, received_at
         FROM machine_logs
         ORDER BY id ASC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map([limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, batch_id, record_json, received_at) = row?;
        records.push(StoredRecord {
            id,
            batch_id,
            record: serde_json::from_str(&record_json)?,
            received_at,
        });
    }

    Ok(records)
}

/// Returns the most recently inserted record, or `None` on an empty log.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQL failure or
/// [`StoreError::Serialization`] if the stored record no longer parses.
pub fn latest_record(conn: &Connection) -> Result<Option<StoredRecord>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, batch_id, record_json, received_at
             FROM machine_logs
             ORDER BY id DESC
             LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    match row {
        Some((id, batch_id, record_json, received_at)) => Ok(Some(StoredRecord {
            id,
            batch_id,
            record: serde_json::from_str(&record_json)?,
            received_at,
        })),
        None => Ok(None),
    }
}

/// Returns the total number of records in the log.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQL failure.
pub fn record_count(conn: &Connection) -> Result<i64, StoreError> {
    let count = conn.query_row("SELECT COUNT(*) FROM machine_logs", [], |row| row.get(0))?;
    Ok(count)
}
