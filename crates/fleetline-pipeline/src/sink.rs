//! The seams between the pipeline and its external collaborators.
//!
//! The accumulator persists through [`BatchSink`] and the alert publisher
//! sends through [`AlertSink`]. Production binds these to the SQLite store
//! and the outbound bus topic; tests bind them to in-memory recorders.

/// An error reported by a sink implementation.
///
/// Sinks collapse their concrete error types into a message at the seam;
/// the pipeline only ever logs them and moves on.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    /// Wraps any displayable error.
    pub fn new(err: impl std::fmt::Display) -> Self {
        Self(err.to_string())
    }
}

/// Durable persistence for one batch.
pub trait BatchSink: Send + Sync + 'static {
    /// Attempts one durable bulk append of the batch.
    ///
    /// Best-effort: on failure the batch is lost for durability purposes
    /// and the pipeline continues. Implementations may block; the
    /// accumulator calls this off the async runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the append did not complete.
    fn append(&self, batch: &[fleetline_types::TelemetryRecord]) -> Result<(), SinkError>;
}

/// Outbound delivery for one alert payload.
pub trait AlertSink: Send + Sync + 'static {
    /// Publishes one serialized alert message.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the message could not be handed to the
    /// transport. Failures are isolated per alert by the caller.
    fn publish(&self, payload: Vec<u8>) -> Result<(), SinkError>;
}
