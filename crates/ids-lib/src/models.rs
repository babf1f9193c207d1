//! Core data models for the intrusion detector

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Caller-supplied feature values, keyed by feature name.
///
/// May hold only part of the schema, and may hold names the schema does not
/// know about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(HashMap<String, f64>);

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Schema-ordered row with absent features filled with zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRow(pub Vec<f64>);

impl ReconciledRow {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reconciled row after the fitted transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledRow(pub Vec<f64>);

impl ScaledRow {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Binary outcome of a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Intrusion,
}

impl Verdict {
    /// Label 0 is normal traffic; every other label is an intrusion.
    pub fn from_label(label: i64) -> Self {
        if label == 0 {
            Verdict::Normal
        } else {
            Verdict::Intrusion
        }
    }

    pub fn is_intrusion(&self) -> bool {
        matches!(self, Verdict::Intrusion)
    }

    /// Lowercase name used in metrics and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Normal => "normal",
            Verdict::Intrusion => "intrusion",
        }
    }

    /// Operator-facing message
    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Normal => "Normal Traffic",
            Verdict::Intrusion => "Intrusion Detected",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Detailed result of one inference call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub verdict: Verdict,
    /// Raw label returned by the classifier
    pub label: i64,
    /// Schema names absent from the record, filled with zero
    pub defaulted_features: Vec<String>,
    /// Record names the schema does not know, ignored
    pub ignored_features: Vec<String>,
}
