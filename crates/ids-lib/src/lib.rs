//! Intrusion detection library
//!
//! This crate provides the core functionality for:
//! - Reconciling partial feature records against the trained feature schema
//! - Applying the fitted transform and the binary classifier
//! - Loading and checksum-validating the trained artifacts
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod fields;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;

pub use artifacts::{ArtifactBundle, ArtifactManifest};
pub use error::{
    ArtifactError, InferenceError, PredictError, RecordError, SchemaMismatchError, TransformError,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DetectorMetrics, StructuredLogger};
pub use predictor::{InferenceStats, IntrusionDetector, ReconcilePolicy};
pub use schema::FeatureSchema;
