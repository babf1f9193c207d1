//! Error types for the reconciliation and inference pipeline
//!
//! Every stage reports its own typed failure. None of them is ever turned
//! into a default verdict; the caller decides how to present it.

use std::path::PathBuf;
use thiserror::Error;

/// The loaded artifacts disagree on the row width.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{component} expects {expected} features but the schema has {actual}")]
pub struct SchemaMismatchError {
    pub component: String,
    pub expected: usize,
    pub actual: usize,
}

/// Failure of the fitted numeric transform
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("transform expects a row of width {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("non-finite value {value} at feature index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("transform failed: {0}")]
    Failed(String),
}

/// Failure of the classifier
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("classifier expects a row of width {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("classifier produced no output")]
    MissingOutput,

    #[error("classifier output is not a usable label: {0}")]
    UnexpectedOutput(String),

    #[error("classifier backend failed: {0}")]
    Backend(String),
}

/// Record rejected under the strict reconciliation policy
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("unknown features: {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),

    #[error("missing features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("value {value} for {feature} is outside [{min}, {max}]")]
    OutOfRange {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{feature} must be a whole number, got {value}")]
    NotWholeNumber { feature: String, value: f64 },

    #[error("{feature} must be one of {allowed:?}, got {value}")]
    NotAChoice {
        feature: String,
        value: f64,
        allowed: Vec<f64>,
    },
}

/// Failure while loading the schema, transform or classifier artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no checksum listed for {path}")]
    MissingChecksum { path: PathBuf },

    #[error("checksum listed for {name}, which is not an artifact in this bundle")]
    UnusedChecksum { name: String },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("feature schema is empty")]
    EmptySchema,

    #[error("feature {0} appears more than once in the schema")]
    DuplicateFeature(String),

    #[error("invalid transform parameters: {0}")]
    InvalidTransform(String),

    #[error("invalid classifier: {0}")]
    InvalidClassifier(String),

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),
}

/// Any failure of a single `predict_intrusion` call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Stable identifier used for metric labels and API error codes
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Record(_) => "invalid_record",
            PredictError::SchemaMismatch(_) => "schema_mismatch",
            PredictError::Transform(_) => "transform_error",
            PredictError::Inference(_) => "inference_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_error_kinds() {
        let err: PredictError = TransformError::WidthMismatch {
            expected: 6,
            actual: 5,
        }
        .into();
        assert_eq!(err.kind(), "transform_error");

        let err: PredictError = InferenceError::MissingOutput.into();
        assert_eq!(err.kind(), "inference_error");

        let err: PredictError = RecordError::UnknownFeatures(vec!["bogus_field".into()]).into();
        assert_eq!(err.kind(), "invalid_record");
    }

    #[test]
    fn test_error_messages_name_the_features() {
        let err = RecordError::MissingFeatures(vec!["dst_bytes".into(), "srv_count".into()]);
        assert_eq!(err.to_string(), "missing features: dst_bytes, srv_count");

        let err = SchemaMismatchError {
            component: "transform".into(),
            expected: 5,
            actual: 6,
        };
        assert_eq!(
            err.to_string(),
            "transform expects 5 features but the schema has 6"
        );
    }
}
