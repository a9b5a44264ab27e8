//! Shared types for the Fleetline telemetry platform.
//!
//! This crate provides the foundational types used across all Fleetline
//! crates: the telemetry record shape, anomaly flag maps, and the record
//! parsing/validation errors (via `thiserror`).
//!
//! No crate in the workspace depends on anything *except* `fleetline-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Anomaly flags attached to a scored record: anomaly label → whether that
/// rule fired. Only labels from the loaded model's label set appear.
///
/// A `BTreeMap` keeps flag serialization order deterministic.
pub type AnomalyFlags = BTreeMap<String, bool>;

/// Errors produced when parsing an inbound payload into a [`TelemetryRecord`].
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The payload was not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but was not a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A field held something other than a number, string, or boolean.
    #[error("field '{0}' is not a scalar value")]
    NonScalarField(String),
}

/// One telemetry sample from one machine at one instant.
///
/// A record is an ordered mapping from field name to scalar value (number,
/// string, or boolean). Field order is preserved through serialization
/// (`serde_json` runs with `preserve_order`), and equality is field-for-field
/// regardless of insertion order. Records are immutable once enqueued; the
/// only mutation point is [`TelemetryRecord::with_flags`], which returns a
/// new copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord(Map<String, Value>);

impl TelemetryRecord {
    /// Builds a record from a JSON object map, rejecting non-scalar fields.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NonScalarField`] if any value is null, an
    /// array, or a nested object.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, RecordError> {
        for (name, value) in &fields {
            if !matches!(value, Value::Number(_) | Value::String(_) | Value::Bool(_)) {
                return Err(RecordError::NonScalarField(name.clone()));
            }
        }
        Ok(Self(fields))
    }

    /// Parses an inbound message payload into a record.
    ///
    /// The payload must be a flat JSON object whose values are all scalars.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Json`] for malformed JSON,
    /// [`RecordError::NotAnObject`] for non-object payloads, and
    /// [`RecordError::NonScalarField`] for nested or null values.
    pub fn parse(payload: &[u8]) -> Result<Self, RecordError> {
        match serde_json::from_slice::<Value>(payload)? {
            Value::Object(fields) => Self::from_fields(fields),
            _ => Err(RecordError::NotAnObject),
        }
    }

    /// Returns the underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Reads a field as a float, if present and numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    /// Returns a copy of this record with the given anomaly flags merged in
    /// as boolean fields. This is the alert payload shape: the original
    /// fields plus one boolean per anomaly label.
    pub fn with_flags(&self, flags: &AnomalyFlags) -> Self {
        let mut merged = self.0.clone();
        for (label, fired) in flags {
            merged.insert(label.clone(), Value::Bool(*fired));
        }
        Self(merged)
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> TelemetryRecord {
        TelemetryRecord::parse(value.to_string().as_bytes()).expect("record should parse")
    }

    #[test]
    fn parse_accepts_flat_scalar_object() {
        let rec = record(json!({
            "machine_id": "MACHINE_001",
            "Fuel Used (L)": 5.0,
            "Engine Hours": 10.0,
            "Safety Alert": false,
        }));

        assert_eq!(rec.number("Fuel Used (L)"), Some(5.0));
        assert_eq!(rec.number("Engine Hours"), Some(10.0));
        assert_eq!(rec.get("machine_id"), Some(&json!("MACHINE_001")));
    }

    #[test]
    fn parse_rejects_non_object_payloads() {
        assert!(matches!(
            TelemetryRecord::parse(b"[1, 2, 3]"),
            Err(RecordError::NotAnObject)
        ));
        assert!(matches!(
            TelemetryRecord::parse(b"\"hello\""),
            Err(RecordError::NotAnObject)
        ));
        assert!(matches!(
            TelemetryRecord::parse(b"not json"),
            Err(RecordError::Json(_))
        ));
    }

    #[test]
    fn parse_rejects_nested_and_null_fields() {
        let nested = json!({"machine_id": "M1", "readings": {"fuel": 5.0}});
        match TelemetryRecord::parse(nested.to_string().as_bytes()) {
            Err(RecordError::NonScalarField(name)) => assert_eq!(name, "readings"),
            other => panic!("expected NonScalarField, got {other:?}"),
        }

        let null = json!({"machine_id": null});
        assert!(matches!(
            TelemetryRecord::parse(null.to_string().as_bytes()),
            Err(RecordError::NonScalarField(_))
        ));
    }

    #[test]
    fn round_trip_preserves_fields_exactly() {
        let rec = record(json!({"Fuel Used (L)": 5.0, "Engine Hours": 10.0}));

        let serialized = serde_json::to_vec(&rec).expect("record should serialize");
        let restored = TelemetryRecord::parse(&serialized).expect("round trip should parse");

        assert_eq!(restored, rec);
        assert_eq!(restored.number("Fuel Used (L)"), Some(5.0));
        assert_eq!(restored.number("Engine Hours"), Some(10.0));
    }

    #[test]
    fn with_flags_merges_without_mutating_original() {
        let rec = record(json!({"machine_id": "M1", "Idling Time (min)": 95.0}));

        let mut flags = AnomalyFlags::new();
        flags.insert("HighIdling".to_string(), true);

        let alert = rec.with_flags(&flags);
        assert_eq!(alert.get("HighIdling"), Some(&json!(true)));
        assert_eq!(alert.get("machine_id"), Some(&json!("M1")));

        // Original record untouched.
        assert_eq!(rec.get("HighIdling"), None);
    }
}
