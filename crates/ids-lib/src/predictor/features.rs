//! Feature reconciliation for ML inference
//!
//! Turns a partial, unordered feature record into a row laid out exactly as
//! the schema the transform and classifier were fitted on. The row order
//! depends only on the schema, never on the record's iteration order.

use crate::error::RecordError;
use crate::models::{FeatureRecord, ReconciledRow};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};

/// Value used for schema names the record does not supply
pub const MISSING_FEATURE_VALUE: f64 = 0.0;

/// How to treat records that do not cover the schema exactly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePolicy {
    /// Missing names become zero, unknown names are dropped
    #[default]
    Lenient,
    /// Missing or unknown names fail the request
    Strict,
}

/// Reconciled row together with what the reconciliation had to paper over
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub row: ReconciledRow,
    /// Schema names the record lacked, in schema order
    pub defaulted: Vec<String>,
    /// Record names outside the schema, sorted
    pub ignored: Vec<String>,
}

/// Lay `record` out in schema order, zero-filling absent names.
///
/// Never fails; names outside the schema are ignored.
pub fn reconcile(record: &FeatureRecord, schema: &FeatureSchema) -> ReconciledRow {
    ReconciledRow(
        schema
            .names()
            .iter()
            .map(|name| record.get(name).unwrap_or(MISSING_FEATURE_VALUE))
            .collect(),
    )
}

/// Reconcile under `policy`, reporting defaulted and ignored names
pub fn reconcile_with(
    record: &FeatureRecord,
    schema: &FeatureSchema,
    policy: ReconcilePolicy,
) -> Result<Reconciliation, RecordError> {
    let defaulted: Vec<String> = schema
        .names()
        .iter()
        .filter(|name| !record.contains(name))
        .cloned()
        .collect();

    let mut ignored: Vec<String> = record
        .names()
        .filter(|name| !schema.contains(name))
        .map(str::to_string)
        .collect();
    ignored.sort();

    if policy == ReconcilePolicy::Strict {
        if !ignored.is_empty() {
            return Err(RecordError::UnknownFeatures(ignored));
        }
        if !defaulted.is_empty() {
            return Err(RecordError::MissingFeatures(defaulted));
        }
    }

    Ok(Reconciliation {
        row: reconcile(record, schema),
        defaulted,
        ignored,
    })
}
