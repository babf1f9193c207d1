//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ids_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{DetectorMetrics, StructuredLogger},
    FeatureRecord, InferenceStats, IntrusionDetector, PredictError, ReconcilePolicy, Verdict,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: DetectorMetrics,
    pub logger: StructuredLogger,
    /// `None` when the artifacts failed to load
    pub detector: Option<Arc<IntrusionDetector>>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: DetectorMetrics,
        logger: StructuredLogger,
        detector: Option<Arc<IntrusionDetector>>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            logger,
            detector,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: FeatureRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub verdict: Verdict,
    pub label: i64,
    pub message: String,
    pub defaulted_features: Vec<String>,
    pub ignored_features: Vec<String>,
    pub artifact_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub features: Vec<String>,
    pub artifact_version: String,
    pub policy: ReconcilePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(status: StatusCode, code: &str, error: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: error.into(),
        code: code.to_string(),
    };
    (status, Json(body)).into_response()
}

fn unavailable() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "unavailable",
        "artifacts are not loaded",
    )
}

fn status_for(error: &PredictError) -> StatusCode {
    match error {
        PredictError::Record(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictError::SchemaMismatch(_)
        | PredictError::Transform(_)
        | PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a verdict for one feature record
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let Some(detector) = state.detector.as_ref() else {
        return unavailable();
    };

    let start = Instant::now();
    let result = detector.predict(&request.features);
    let elapsed = start.elapsed();
    state
        .metrics
        .observe_inference_latency(elapsed.as_secs_f64());
    state
        .health_registry
        .update(components::CLASSIFIER, detector.stats().classifier_health())
        .await;

    match result {
        Ok(prediction) => {
            state.metrics.record_prediction(&prediction);
            state
                .logger
                .log_verdict(&prediction, detector.version(), elapsed.as_micros());

            let response = PredictResponse {
                verdict: prediction.verdict,
                label: prediction.label,
                message: prediction.verdict.message().to_string(),
                defaulted_features: prediction.defaulted_features,
                ignored_features: prediction.ignored_features,
                artifact_version: detector.version().to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            state.metrics.inc_prediction_errors(e.kind());
            state.logger.log_prediction_failed(e.kind(), &e.to_string());
            error_response(status_for(&e), e.kind(), e.to_string())
        }
    }
}

/// Feature order the loaded artifacts expect
async fn schema(State(state): State<Arc<AppState>>) -> Response {
    let Some(detector) = state.detector.as_ref() else {
        return unavailable();
    };

    let response = SchemaResponse {
        features: detector.schema().names().to_vec(),
        artifact_version: detector.version().to_string(),
        policy: detector.policy(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Inference counters of the loaded detector
async fn stats(State(state): State<Arc<AppState>>) -> Response {
    let Some(detector) = state.detector.as_ref() else {
        return unavailable();
    };
    let stats: InferenceStats = detector.stats();
    (StatusCode::OK, Json(stats)).into_response()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "metrics", e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/predict", post(predict))
        .route("/v1/schema", get(schema))
        .route("/v1/stats", get(stats))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
