//! CLI subcommands

pub mod fields;
pub mod health;
pub mod predict;
pub mod schema;
pub mod stats;

use crate::client::ApiClient;
use anyhow::{Context, Result};
use ids_lib::{ArtifactBundle, IntrusionDetector, ReconcilePolicy};
use std::path::{Path, PathBuf};

/// Where predictions and schemas come from
pub enum Target {
    /// Running detector service
    Remote(ApiClient),
    /// Artifact directory evaluated in-process
    Local(PathBuf),
}

/// Load an artifact directory into a detector
pub fn load_local(dir: &Path, policy: ReconcilePolicy) -> Result<IntrusionDetector> {
    let bundle = ArtifactBundle::load_dir(dir)
        .with_context(|| format!("Failed to load artifacts from {}", dir.display()))?;
    bundle
        .into_detector(policy)
        .context("Artifacts are inconsistent")
}
