//! Intrusion Detector - network traffic verdict service
//!
//! Loads the feature schema, fitted transform and classifier once at
//! startup and serves verdicts for feature records over HTTP.

use anyhow::Result;
use ids_detector::{api, config::DetectorConfig, load_detector};
use ids_lib::{
    health::{components, HealthRegistry},
    DetectorMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DETECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting ids-detector");

    let config = DetectorConfig::load()?;
    info!(
        instance = %config.instance_name,
        artifact_dir = %config.artifact_dir.display(),
        strict_features = config.strict_features,
        "Detector configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::CLASSIFIER).await;

    let metrics = DetectorMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(
        DETECTOR_VERSION,
        &config.artifact_dir.display().to_string(),
    );

    let detector = load_detector(&config, &health_registry, &metrics, &logger).await;

    let app_state = Arc::new(api::AppState::new(
        health_registry,
        metrics,
        logger.clone(),
        detector,
    ));

    let shutdown_logger = logger.clone();
    let shutdown = async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    };

    api::serve(&config.listen_addr(), app_state, shutdown).await?;
    info!("Shutting down");

    Ok(())
}
