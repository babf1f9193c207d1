//! Loaded schema, transform and classifier behind one immutable handle

use super::features::{reconcile_with, ReconcilePolicy};
use super::{scale, score, Classifier, Transform};
use crate::error::{PredictError, SchemaMismatchError};
use crate::health::ComponentHealth;
use crate::models::{FeatureRecord, Prediction, Verdict};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Inference latency above which a call is counted as slow
pub const SLOW_INFERENCE_MS: u128 = 5;

/// Schema, transform and classifier checked to agree with each other.
///
/// Nothing here is mutated after construction apart from the statistics
/// counters, so one detector can serve concurrent callers behind an `Arc`.
pub struct IntrusionDetector {
    schema: FeatureSchema,
    transform: Box<dyn Transform>,
    classifier: Box<dyn Classifier>,
    policy: ReconcilePolicy,
    version: String,
    inference_count: AtomicU64,
    rejected_count: AtomicU64,
    failure_count: AtomicU64,
    intrusion_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl IntrusionDetector {
    /// Bundle the three artifacts, failing if their widths disagree
    pub fn new(
        schema: FeatureSchema,
        transform: Box<dyn Transform>,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, SchemaMismatchError> {
        let width = schema.len();
        if let Some(expected) = transform.input_width().filter(|w| *w != width) {
            return Err(SchemaMismatchError {
                component: format!("transform {}", transform.name()),
                expected,
                actual: width,
            });
        }
        if let Some(expected) = classifier.input_width().filter(|w| *w != width) {
            return Err(SchemaMismatchError {
                component: format!("classifier {}", classifier.name()),
                expected,
                actual: width,
            });
        }

        Ok(Self {
            schema,
            transform,
            classifier,
            policy: ReconcilePolicy::default(),
            version: "unversioned".to_string(),
            inference_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            intrusion_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn transform_name(&self) -> &str {
        self.transform.name()
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Verdict for one record
    pub fn predict_intrusion(&self, record: &FeatureRecord) -> Result<Verdict, PredictError> {
        self.predict(record).map(|p| p.verdict)
    }

    /// Verdict plus the raw label and the reconciliation report
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, PredictError> {
        let start = Instant::now();
        let result = self.run(record);
        let elapsed = start.elapsed();

        self.inference_count.fetch_add(1, Ordering::Relaxed);
        match &result {
            Ok(prediction) => {
                if prediction.verdict.is_intrusion() {
                    self.intrusion_count.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(PredictError::Record(e)) => {
                self.rejected_count.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "Record rejected");
            }
            Err(e) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, kind = e.kind(), "Inference failed");
            }
        }

        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target", SLOW_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        result
    }

    fn run(&self, record: &FeatureRecord) -> Result<Prediction, PredictError> {
        let reconciled = reconcile_with(record, &self.schema, self.policy)?;
        if !reconciled.ignored.is_empty() {
            warn!(
                ignored = ?reconciled.ignored,
                "Record carries features outside the schema; they were ignored"
            );
        }

        let scaled = scale(&reconciled.row, self.transform.as_ref())?;
        let label = score(&scaled, self.classifier.as_ref())?;

        Ok(Prediction {
            verdict: Verdict::from_label(label),
            label,
            defaulted_features: reconciled.defaulted,
            ignored_features: reconciled.ignored,
        })
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            rejected_records: self.rejected_count.load(Ordering::Relaxed),
            failed_inferences: self.failure_count.load(Ordering::Relaxed),
            intrusions: self.intrusion_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

/// Inference statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_inferences: u64,
    /// Records refused by the reconciliation policy; not classifier faults
    pub rejected_records: u64,
    /// Transform or classifier failures
    pub failed_inferences: u64,
    pub intrusions: u64,
    pub slow_inferences: u64,
}

impl InferenceStats {
    /// Classifier health derived from the counters.
    ///
    /// Unhealthy when at least half of the scored records failed, degraded
    /// on any failure or when more than a tenth of the calls were slow.
    pub fn classifier_health(&self) -> ComponentHealth {
        let scored = self.total_inferences.saturating_sub(self.rejected_records);
        if self.failed_inferences > 0 {
            let message = format!("{} of {} inferences failed", self.failed_inferences, scored);
            if self.failed_inferences * 2 >= scored {
                return ComponentHealth::unhealthy(message);
            }
            return ComponentHealth::degraded(message);
        }
        if self.slow_inferences * 10 > self.total_inferences {
            return ComponentHealth::degraded(format!(
                "{} of {} inferences exceeded {}ms",
                self.slow_inferences, self.total_inferences, SLOW_INFERENCE_MS
            ));
        }
        ComponentHealth::healthy()
    }
}
