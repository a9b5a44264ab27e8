//! Error types for the telemetry log.

/// Errors that can occur during telemetry log operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("telemetry log database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failed.
    #[error("telemetry log serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An append was attempted with no records.
    #[error("cannot append an empty batch")]
    EmptyBatch,
}
