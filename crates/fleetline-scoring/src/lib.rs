//! Anomaly scoring for Fleetline.
//!
//! Scoring is a pure function over a batch of telemetry records: it returns
//! the subset of records that violate the loaded rule model, each annotated
//! with boolean flags keyed by anomaly label. The model is declarative data
//! (a JSON file of per-label threshold rules), so decision boundaries are a
//! deployment concern, not code.
//!
//! A server with no model runs the [`Scorer::Disabled`] variant, which
//! scores every batch to the empty set. Call sites never branch on model
//! presence.

mod model;
mod scorer;

pub use model::{ModelError, Rule, RuleModel};
pub use scorer::{ScoreOutcome, ScoredRecord, Scorer};
