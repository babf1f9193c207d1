//! Reconciliation and inference pipeline
//!
//! `reconcile` → `scale` → `classify`, composed by `predict_intrusion`.
//! The transform and the classifier are opaque fitted artifacts reached
//! through the `Transform` and `Classifier` traits.

mod detector;
mod features;
mod inference;
mod transform;

pub use detector::{InferenceStats, IntrusionDetector, SLOW_INFERENCE_MS};
pub use features::{
    reconcile, reconcile_with, ReconcilePolicy, Reconciliation, MISSING_FEATURE_VALUE,
};
pub use inference::{LinearClassifier, OnnxClassifier};
pub use transform::{IdentityTransform, StandardScaler};

use crate::error::{InferenceError, PredictError, TransformError};
use crate::models::{FeatureRecord, ReconciledRow, ScaledRow, Verdict};
use crate::schema::FeatureSchema;

/// Fitted numeric transform applied to a reconciled row
pub trait Transform: Send + Sync {
    /// Row width the transform was fitted on, if it has one
    fn input_width(&self) -> Option<usize>;

    /// Forward mapping; must return a row of the same width
    fn apply(&self, row: &[f64]) -> Result<Vec<f64>, TransformError>;

    /// Short name for logs and metrics
    fn name(&self) -> &str;
}

/// Opaque binary classifier scoring a single row
pub trait Classifier: Send + Sync {
    /// Row width the classifier was trained on, if known
    fn input_width(&self) -> Option<usize>;

    /// Raw label for one row
    fn score(&self, row: &[f64]) -> Result<i64, InferenceError>;

    /// Short name for logs and metrics
    fn name(&self) -> &str;
}

/// Apply `transform` to `row`.
///
/// A row whose width differs from the transform's fitted width is rejected
/// before the transform runs.
pub fn scale(row: &ReconciledRow, transform: &dyn Transform) -> Result<ScaledRow, TransformError> {
    if let Some(expected) = transform.input_width() {
        if expected != row.len() {
            return Err(TransformError::WidthMismatch {
                expected,
                actual: row.len(),
            });
        }
    }

    let scaled = transform.apply(row.values())?;
    if scaled.len() != row.len() {
        return Err(TransformError::Failed(format!(
            "{} changed row width from {} to {}",
            transform.name(),
            row.len(),
            scaled.len()
        )));
    }

    Ok(ScaledRow(scaled))
}

/// Raw classifier label for `row`
pub fn score(row: &ScaledRow, model: &dyn Classifier) -> Result<i64, InferenceError> {
    if let Some(expected) = model.input_width() {
        if expected != row.len() {
            return Err(InferenceError::WidthMismatch {
                expected,
                actual: row.len(),
            });
        }
    }
    model.score(row.values())
}

/// Classify `row`: label 0 is normal traffic, anything else an intrusion
pub fn classify(row: &ScaledRow, model: &dyn Classifier) -> Result<Verdict, InferenceError> {
    score(row, model).map(Verdict::from_label)
}

/// Reconcile, scale and classify one record
pub fn predict_intrusion(
    record: &FeatureRecord,
    schema: &FeatureSchema,
    transform: &dyn Transform,
    model: &dyn Classifier,
) -> Result<Verdict, PredictError> {
    let row = reconcile(record, schema);
    let scaled = scale(&row, transform)?;
    Ok(classify(&scaled, model)?)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::fields::traffic_schema;

    #[test]
    fn test_classify_label_mapping() {
        let row = ScaledRow(vec![0.0; 6]);
        assert_eq!(
            classify(&row, &FixedClassifier::new(1, None)).unwrap(),
            Verdict::Intrusion
        );
        assert_eq!(
            classify(&row, &FixedClassifier::new(0, None)).unwrap(),
            Verdict::Normal
        );
        assert_eq!(
            classify(&row, &FixedClassifier::new(2, None)).unwrap(),
            Verdict::Intrusion
        );
    }

    #[test]
    fn test_classify_width_mismatch() {
        let row = ScaledRow(vec![0.0; 5]);
        let err = classify(&row, &FixedClassifier::new(0, Some(6))).unwrap_err();
        assert_eq!(
            err,
            InferenceError::WidthMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_classify_surfaces_backend_failure() {
        let row = ScaledRow(vec![0.0; 6]);
        assert!(matches!(
            classify(&row, &BrokenClassifier),
            Err(InferenceError::Backend(_))
        ));
    }

    #[test]
    fn test_scale_preserves_width() {
        let scaler = StandardScaler::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 0.5]).unwrap();
        for row in [vec![0.0, 0.0, 0.0], vec![1.0, 2.0, 3.0], vec![-5.0, 1e9, 0.25]] {
            let reconciled = ReconciledRow(row);
            let scaled = scale(&reconciled, &scaler).unwrap();
            assert_eq!(scaled.len(), reconciled.len());
        }
    }

    #[test]
    fn test_scale_rejects_wrong_width() {
        let scaler = StandardScaler::new(vec![0.0; 6], vec![1.0; 6]).unwrap();
        let err = scale(&ReconciledRow(vec![1.0; 5]), &scaler).unwrap_err();
        assert_eq!(
            err,
            TransformError::WidthMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_scale_rejects_transform_changing_width() {
        let err = scale(&ReconciledRow(vec![1.0; 3]), &ShrinkingTransform).unwrap_err();
        assert!(matches!(err, TransformError::Failed(_)));
    }

    #[test]
    fn test_predict_intrusion_feeds_schema_ordered_row() {
        let schema = traffic_schema().unwrap();
        let model = FixedClassifier::new(1, Some(6));
        let record = FeatureRecord::new().with("src_bytes", 500.0).with("count", 5.0);

        let verdict = predict_intrusion(&record, &schema, &IdentityTransform, &model).unwrap();
        assert_eq!(verdict, Verdict::Intrusion);
        assert_eq!(
            model.seen.lock().unwrap()[0],
            vec![5.0, 500.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_predict_intrusion_is_idempotent() {
        let schema = traffic_schema().unwrap();
        let scaler = StandardScaler::new(vec![10.0; 6], vec![2.0; 6]).unwrap();
        let model = LinearClassifier::new(vec![0.5, 0.001, -1.0, 3.0, 0.0, 0.1], -1.0, 0.5).unwrap();
        let record = FeatureRecord::new()
            .with("count", 120.0)
            .with("srv_serror_rate", 0.9);

        let first = predict_intrusion(&record, &schema, &scaler, &model).unwrap();
        let second = predict_intrusion(&record, &schema, &scaler, &model).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_predict_intrusion_surfaces_transform_error() {
        let schema = traffic_schema().unwrap();
        let scaler = StandardScaler::new(vec![0.0; 5], vec![1.0; 5]).unwrap();
        let model = FixedClassifier::new(0, None);

        let err = predict_intrusion(&FeatureRecord::new(), &schema, &scaler, &model).unwrap_err();
        assert_eq!(err.kind(), "transform_error");
        assert_eq!(model.calls.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[test]
    fn test_predict_intrusion_surfaces_inference_error() {
        let schema = traffic_schema().unwrap();
        let err = predict_intrusion(
            &FeatureRecord::new(),
            &schema,
            &IdentityTransform,
            &BrokenClassifier,
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }
}
