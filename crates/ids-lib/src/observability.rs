//! Observability infrastructure for the intrusion detector
//!
//! Provides:
//! - Prometheus metrics (inference latency, verdicts, errors, defaulted features, artifact version)
//! - Structured JSON logging with tracing

use crate::models::{Prediction, Verdict};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DetectorMetricsInner> = OnceLock::new();

struct DetectorMetricsInner {
    inference_latency_seconds: Histogram,
    verdicts: IntCounterVec,
    prediction_errors: IntCounterVec,
    defaulted_features: IntCounter,
    ignored_features: IntCounter,
    artifact_info: GaugeVec,
}

impl DetectorMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "ids_detector_inference_latency_seconds",
                "Time spent reconciling, scaling and classifying one record",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            verdicts: register_int_counter_vec!(
                "ids_detector_verdicts_total",
                "Verdicts rendered, by verdict",
                &["verdict"]
            )
            .expect("Failed to register verdicts_total"),

            prediction_errors: register_int_counter_vec!(
                "ids_detector_prediction_errors_total",
                "Failed predictions, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            defaulted_features: register_int_counter!(
                "ids_detector_defaulted_features_total",
                "Schema features absent from a record and filled with zero"
            )
            .expect("Failed to register defaulted_features_total"),

            ignored_features: register_int_counter!(
                "ids_detector_ignored_features_total",
                "Record features outside the schema that were ignored"
            )
            .expect("Failed to register ignored_features_total"),

            artifact_info: register_gauge_vec!(
                "ids_detector_artifact_info",
                "Information about the loaded artifacts",
                &["version", "transform", "classifier"]
            )
            .expect("Failed to register artifact_info"),
        }
    }
}

/// Handle to the process-wide detector metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct DetectorMetrics {
    _private: (),
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DetectorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    /// Count a successful prediction and what reconciliation filled in
    pub fn record_prediction(&self, prediction: &Prediction) {
        let inner = self.inner();
        inner
            .verdicts
            .with_label_values(&[prediction.verdict.as_str()])
            .inc();
        inner
            .defaulted_features
            .inc_by(prediction.defaulted_features.len() as u64);
        inner
            .ignored_features
            .inc_by(prediction.ignored_features.len() as u64);
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors
            .with_label_values(&[kind])
            .inc();
    }

    pub fn verdict_count(&self, verdict: Verdict) -> u64 {
        self.inner()
            .verdicts
            .with_label_values(&[verdict.as_str()])
            .get()
    }

    pub fn error_count(&self, kind: &str) -> u64 {
        self.inner()
            .prediction_errors
            .with_label_values(&[kind])
            .get()
    }

    pub fn set_artifact_info(&self, version: &str, transform: &str, classifier: &str) {
        self.inner().artifact_info.reset();
        self.inner()
            .artifact_info
            .with_label_values(&[version, transform, classifier])
            .set(1.0);
    }
}

/// Structured logger for detector events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, artifact_dir: &str) {
        info!(
            event = "detector_started",
            instance = %self.instance,
            detector_version = %version,
            artifact_dir = %artifact_dir,
            "Intrusion detector started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "detector_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Intrusion detector shutting down"
        );
    }

    pub fn log_artifacts_loaded(
        &self,
        version: &str,
        features: usize,
        transform: &str,
        classifier: &str,
    ) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            artifact_version = %version,
            features = features,
            transform = %transform,
            classifier = %classifier,
            "Artifacts loaded"
        );
    }

    pub fn log_artifacts_failed(&self, artifact_dir: &str, error: &str) {
        warn!(
            event = "artifacts_failed",
            instance = %self.instance,
            artifact_dir = %artifact_dir,
            error = %error,
            "Failed to load artifacts, predictions unavailable"
        );
    }

    pub fn log_verdict(&self, prediction: &Prediction, artifact_version: &str, elapsed_us: u128) {
        match prediction.verdict {
            Verdict::Intrusion => warn!(
                event = "verdict_rendered",
                instance = %self.instance,
                verdict = prediction.verdict.as_str(),
                label = prediction.label,
                artifact_version = %artifact_version,
                elapsed_us = elapsed_us,
                "Intrusion detected"
            ),
            Verdict::Normal => info!(
                event = "verdict_rendered",
                instance = %self.instance,
                verdict = prediction.verdict.as_str(),
                label = prediction.label,
                artifact_version = %artifact_version,
                elapsed_us = elapsed_us,
                "Normal traffic"
            ),
        }

        if !prediction.defaulted_features.is_empty() {
            info!(
                event = "features_defaulted",
                instance = %self.instance,
                defaulted = ?prediction.defaulted_features,
                ignored = ?prediction.ignored_features,
                "Record did not cover the schema; missing features set to zero"
            );
        }
    }

    pub fn log_prediction_failed(&self, kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            kind = %kind,
            error = %error,
            "Prediction failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(verdict: Verdict, defaulted: usize) -> Prediction {
        Prediction {
            verdict,
            label: if verdict.is_intrusion() { 1 } else { 0 },
            defaulted_features: (0..defaulted).map(|i| format!("f{}", i)).collect(),
            ignored_features: Vec::new(),
        }
    }

    #[test]
    fn test_detector_metrics_counters() {
        // Global registry: assert on deltas only
        let metrics = DetectorMetrics::new();
        let intrusions = metrics.verdict_count(Verdict::Intrusion);
        let errors = metrics.error_count("transform_error");

        metrics.observe_inference_latency(0.0002);
        metrics.record_prediction(&prediction(Verdict::Intrusion, 2));
        metrics.inc_prediction_errors("transform_error");
        metrics.set_artifact_info("v1", "standard_scaler", "linear");

        assert!(metrics.verdict_count(Verdict::Intrusion) >= intrusions + 1);
        assert!(metrics.error_count("transform_error") >= errors + 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("ids-1");
        assert_eq!(logger.instance, "ids-1");
        logger.log_verdict(&prediction(Verdict::Normal, 1), "v1", 42);
    }
}
