//! The batch scorer.

use std::path::Path;

use fleetline_types::{AnomalyFlags, TelemetryRecord};

use crate::model::RuleModel;

/// A record flagged anomalous, with one boolean per model label.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// A copy of the originating record.
    pub record: TelemetryRecord,
    /// Anomaly label → whether that rule fired. Every label in the model's
    /// label set is present; at least one is true.
    pub flags: AnomalyFlags,
}

/// The result of scoring one batch.
#[derive(Debug, Clone, Default)]
pub struct ScoreOutcome {
    /// Records with at least one fired rule.
    pub flagged: Vec<ScoredRecord>,
    /// Records skipped because a required feature was missing or
    /// non-numeric.
    pub unscorable: usize,
}

/// The scoring capability: either a loaded rule model or nothing.
///
/// `Disabled` scores every batch to the empty outcome, so call sites are
/// always safe to call [`Scorer::score`] without checking for a model.
pub enum Scorer {
    /// No model loaded; scoring returns no anomalies.
    Disabled,
    /// Threshold rules evaluated per record.
    Rules(RuleModel),
}

impl Scorer {
    /// Builds a scorer from an optional model path.
    ///
    /// A missing path means scoring is configured off. A path that fails to
    /// load degrades to [`Scorer::Disabled`] with a warning rather than
    /// refusing to start: ingestion and persistence are more important than
    /// scoring.
    pub fn from_model_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::info!("no model configured, anomaly scoring disabled");
            return Self::Disabled;
        };

        match RuleModel::load(path) {
            Ok(model) => {
                tracing::info!(
                    path = %path.display(),
                    rules = model.rules.len(),
                    labels = ?model.labels(),
                    "loaded anomaly rule model"
                );
                Self::Rules(model)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "failed to load anomaly model, scoring disabled: {}",
                    e
                );
                Self::Disabled
            }
        }
    }

    /// Whether a model is loaded.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Rules(_))
    }

    /// Scores a batch, returning the flagged subset.
    ///
    /// A record missing any required feature (or carrying it as a
    /// non-numeric value) is unscorable: it is skipped and counted, and
    /// scoring continues with the rest of the batch. Scoring is total — it
    /// never fails, and an empty batch or a disabled scorer yields the
    /// empty outcome.
    pub fn score(&self, batch: &[TelemetryRecord]) -> ScoreOutcome {
        let model = match self {
            Self::Disabled => return ScoreOutcome::default(),
            Self::Rules(model) => model,
        };

        let mut outcome = ScoreOutcome::default();

        for record in batch {
            if model
                .required_features
                .iter()
                .any(|feature| record.number(feature).is_none())
            {
                outcome.unscorable += 1;
                continue;
            }

            let mut flags = AnomalyFlags::new();
            let mut any_fired = false;
            for rule in &model.rules {
                let fired = record.number(&rule.field).is_some_and(|v| rule.fires_on(v));
                any_fired |= fired;
                // A label backed by several rules is true if any of them fired.
                let entry = flags.entry(rule.label.clone()).or_insert(false);
                *entry |= fired;
            }

            if any_fired {
                outcome.flagged.push(ScoredRecord {
                    record: record.clone(),
                    flags,
                });
            }
        }

        outcome
    }
}
