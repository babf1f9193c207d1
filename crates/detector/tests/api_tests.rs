//! Integration tests for the detector API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ids_detector::{
    api::{create_router, AppState},
    config::DetectorConfig,
    load_detector,
};
use ids_lib::{
    artifacts::compute_checksum,
    fields::traffic_schema,
    health::{components, HealthRegistry},
    predictor::{Classifier, IdentityTransform},
    DetectorMetrics, InferenceError, IntrusionDetector, StructuredLogger,
};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const SCHEMA: &str =
    r#"["count", "src_bytes", "logged_in", "srv_serror_rate", "dst_bytes", "srv_count"]"#;

// Identity transform with a model that fires on high connection counts
// and error rates: z = 0.05 * count + 10 * srv_serror_rate - 5
const MODEL: &str = r#"{"weights": [0.05, 0.0, 0.0, 10.0, 0.0, 0.0], "intercept": -5.0}"#;

fn write_artifacts() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("schema.json"), SCHEMA).unwrap();
    fs::write(dir.path().join("model.json"), MODEL).unwrap();
    let manifest = json!({
        "version": "test-artifacts",
        "transform": {"kind": "identity"},
        "classifier": {"kind": "linear", "path": "model.json"},
        "sha256": {
            "schema.json": compute_checksum(SCHEMA.as_bytes()),
            "model.json": compute_checksum(MODEL.as_bytes()),
        }
    });
    fs::write(
        dir.path().join("manifest.json"),
        serde_json::to_vec(&manifest).unwrap(),
    )
    .unwrap();
    dir
}

async fn setup_app(artifact_dir: &std::path::Path, strict: bool) -> (Router, Arc<AppState>) {
    let config = DetectorConfig {
        artifact_dir: artifact_dir.to_path_buf(),
        strict_features: strict,
        ..DetectorConfig::default()
    };

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::CLASSIFIER).await;
    let metrics = DetectorMetrics::new();
    let logger = StructuredLogger::new("test");

    let detector = load_detector(&config, &health_registry, &metrics, &logger).await;
    let state = Arc::new(AppState::new(health_registry, metrics, logger, detector));
    (create_router(state.clone()), state)
}

async fn post_predict(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/predict")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_predict_normal_traffic() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), false).await;

    let (status, body) = post_predict(
        app,
        json!({"features": {
            "count": 5, "src_bytes": 500, "logged_in": 1,
            "srv_serror_rate": 0.2, "dst_bytes": 1000, "srv_count": 10
        }}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verdict"], "normal");
    assert_eq!(body["label"], 0);
    assert_eq!(body["message"], "Normal Traffic");
    assert_eq!(body["artifact_version"], "test-artifacts");
    assert_eq!(body["defaulted_features"], json!([]));
}

#[tokio::test]
async fn test_predict_intrusion() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), false).await;

    let (status, body) = post_predict(
        app,
        json!({"features": {"count": 300, "srv_serror_rate": 1.0}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verdict"], "intrusion");
    assert_eq!(body["message"], "Intrusion Detected");
    assert_eq!(
        body["defaulted_features"],
        json!(["src_bytes", "logged_in", "dst_bytes", "srv_count"])
    );
}

#[tokio::test]
async fn test_predict_ignores_unknown_features_when_lenient() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), false).await;

    let (status, body) = post_predict(
        app,
        json!({"features": {"count": 5, "bogus_field": 99}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verdict"], "normal");
    assert_eq!(body["ignored_features"], json!(["bogus_field"]));
}

#[tokio::test]
async fn test_strict_mode_rejects_partial_record() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), true).await;

    let (status, body) = post_predict(app, json!({"features": {"count": 5}})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_record");
    assert!(body["error"].as_str().unwrap().contains("src_bytes"));
}

#[tokio::test]
async fn test_schema_endpoint() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), false).await;

    let (status, body) = get_json(app, "/v1/schema").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"][0], "count");
    assert_eq!(body["features"][5], "srv_count");
    assert_eq!(body["policy"], "lenient");
}

#[tokio::test]
async fn test_ready_after_artifacts_load() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), false).await;

    let (status, body) = get_json(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    let (status, body) = get_json(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["artifact_version"], "test-artifacts");
}

#[tokio::test]
async fn test_missing_artifacts_make_service_unavailable() {
    let empty = TempDir::new().unwrap();
    let (app, state) = setup_app(empty.path(), false).await;
    assert!(state.detector.is_none());

    let (status, body) = post_predict(app.clone(), json!({"features": {"count": 5}})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "unavailable");

    let (status, body) = get_json(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    let (status, body) = get_json(app.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["components"]["artifacts"]["status"], "unhealthy");
    assert_eq!(body["components"]["classifier"]["status"], "unhealthy");

    let (status, _) = get_json(app, "/v1/stats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_stats_endpoint_counts_predictions() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), true).await;

    let (status, _) = post_predict(
        app.clone(),
        json!({"features": {
            "count": 300, "src_bytes": 0, "logged_in": 0,
            "srv_serror_rate": 1.0, "dst_bytes": 0, "srv_count": 0
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_predict(app.clone(), json!({"features": {"count": 5}})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = get_json(app.clone(), "/v1/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_inferences"], 2);
    assert_eq!(body["rejected_records"], 1);
    assert_eq!(body["failed_inferences"], 0);
    assert_eq!(body["intrusions"], 1);

    // Rejected records are caller mistakes and do not count against the classifier
    let (_, body) = get_json(app, "/healthz").await;
    assert_ne!(body["components"]["classifier"]["status"], "unhealthy");
}

/// Classifier whose backend always errors
struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn input_width(&self) -> Option<usize> {
        Some(6)
    }

    fn score(&self, _row: &[f64]) -> Result<i64, InferenceError> {
        Err(InferenceError::Backend("session closed".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn test_failing_classifier_turns_unhealthy() {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::CLASSIFIER).await;
    health_registry.set_ready(true).await;

    let detector = IntrusionDetector::new(
        traffic_schema().unwrap(),
        Box::new(IdentityTransform),
        Box::new(FailingClassifier),
    )
    .unwrap();
    let state = Arc::new(AppState::new(
        health_registry,
        DetectorMetrics::new(),
        StructuredLogger::new("test"),
        Some(Arc::new(detector)),
    ));
    let app = create_router(state);

    let (status, body) = post_predict(app.clone(), json!({"features": {"count": 5}})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "inference_error");

    let (status, body) = get_json(app.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["components"]["classifier"]["status"], "unhealthy");
    assert_eq!(
        body["components"]["classifier"]["message"],
        "1 of 1 inferences failed"
    );

    let (status, body) = get_json(app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["reason"], "Critical component unhealthy");
}

#[tokio::test]
async fn test_tampered_artifacts_are_rejected() {
    let dir = write_artifacts();
    fs::write(
        dir.path().join("model.json"),
        r#"{"weights": [1, 1, 1, 1, 1, 1], "intercept": 100.0}"#,
    )
    .unwrap();
    let (_app, state) = setup_app(dir.path(), false).await;

    assert!(state.detector.is_none());
    let health = state.health_registry.health().await;
    assert!(health.components[components::ARTIFACTS]
        .message
        .as_deref()
        .unwrap()
        .contains("checksum mismatch"));
}

#[tokio::test]
async fn test_non_numeric_feature_is_rejected_by_extractor() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), false).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/predict")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"features": {"count": "five"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_metrics_endpoint_reports_verdicts() {
    let dir = write_artifacts();
    let (app, _state) = setup_app(dir.path(), false).await;

    let (status, _) = post_predict(app.clone(), json!({"features": {"count": 400, "srv_serror_rate": 1.0}})).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("ids_detector_verdicts_total"));
    assert!(text.contains("ids_detector_inference_latency_seconds"));
}
