//! Rule model definition and loading.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur when loading or validating a rule model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("failed to read model file: {0}")]
    FileRead(#[from] std::io::Error),

    /// The model file is not valid JSON.
    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The model parsed but is not usable.
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// A single threshold rule.
///
/// `min` and `max` bound the normal range for `field`: the rule fires (its
/// label goes true) when the observed value falls below `min` or above
/// `max`. At least one bound must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// The anomaly label this rule raises (e.g. `HighIdling`).
    pub label: String,
    /// The record field the rule inspects.
    pub field: String,
    /// Lower bound of the normal range, if any.
    #[serde(default)]
    pub min: Option<f64>,
    /// Upper bound of the normal range, if any.
    #[serde(default)]
    pub max: Option<f64>,
}

impl Rule {
    /// Whether the given value violates this rule's bounds.
    pub fn fires_on(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max)
    }
}

/// A loaded rule model: the feature set a record must carry to be scorable,
/// plus the threshold rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleModel {
    /// Fields that must be present (and numeric) for a record to be scored.
    /// Records missing any of these are unscorable and skipped.
    pub required_features: Vec<String>,
    /// The threshold rules, evaluated independently per record.
    pub rules: Vec<Rule>,
}

impl RuleModel {
    /// Loads and validates a model from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::FileRead` / `ModelError::Parse` for unreadable
    /// or malformed files and `ModelError::Invalid` for a model that parses
    /// but cannot be evaluated (no rules, or a rule with no bounds).
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&contents)?;
        model.validate()?;
        Ok(model)
    }

    /// Validates the model's structure.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Invalid` if the model has no rules, a rule with
    /// an empty label or field, or a rule with neither bound set.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.rules.is_empty() {
            return Err(ModelError::Invalid("model has no rules".to_string()));
        }
        for rule in &self.rules {
            if rule.label.is_empty() || rule.field.is_empty() {
                return Err(ModelError::Invalid(
                    "rule label and field must be non-empty".to_string(),
                ));
            }
            if rule.min.is_none() && rule.max.is_none() {
                return Err(ModelError::Invalid(format!(
                    "rule '{}' has neither min nor max bound",
                    rule.label
                )));
            }
        }
        Ok(())
    }

    /// The model's label set, deduplicated and sorted.
    pub fn labels(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.rules.iter().map(|r| r.label.as_str()).collect();
        set.into_iter().collect()
    }
}
