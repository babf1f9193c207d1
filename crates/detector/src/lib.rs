//! Intrusion detector service
//!
//! Loads the trained artifacts once and serves verdicts over HTTP.

pub mod api;
pub mod config;

use ids_lib::{
    health::{components, HealthRegistry},
    ArtifactBundle, ArtifactError, DetectorMetrics, IntrusionDetector, StructuredLogger,
};
use std::path::Path;
use std::sync::Arc;

/// Load the artifacts and report the outcome to health, metrics and logs.
///
/// Returns `None` when loading fails; the service then stays up but not
/// ready, and prediction requests get 503.
pub async fn load_detector(
    config: &config::DetectorConfig,
    health_registry: &HealthRegistry,
    metrics: &DetectorMetrics,
    logger: &StructuredLogger,
) -> Option<Arc<IntrusionDetector>> {
    match build_detector(&config.artifact_dir, config) {
        Ok(detector) => {
            metrics.set_artifact_info(
                detector.version(),
                detector.transform_name(),
                detector.classifier_name(),
            );
            logger.log_artifacts_loaded(
                detector.version(),
                detector.schema().len(),
                detector.transform_name(),
                detector.classifier_name(),
            );
            health_registry.set_healthy(components::ARTIFACTS).await;
            health_registry.set_healthy(components::CLASSIFIER).await;
            health_registry
                .set_artifact_version(detector.version())
                .await;
            health_registry.set_ready(true).await;
            Some(Arc::new(detector))
        }
        Err(e) => {
            let dir = config.artifact_dir.display().to_string();
            logger.log_artifacts_failed(&dir, &e.to_string());
            health_registry
                .set_unhealthy(components::ARTIFACTS, e.to_string())
                .await;
            health_registry
                .set_unhealthy(components::CLASSIFIER, "No classifier loaded")
                .await;
            None
        }
    }
}

fn build_detector(
    dir: &Path,
    config: &config::DetectorConfig,
) -> Result<IntrusionDetector, ArtifactError> {
    ArtifactBundle::load_dir(dir)?.into_detector(config.policy())
}
