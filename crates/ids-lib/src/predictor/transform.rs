//! Fitted numeric transforms

use super::Transform;
use crate::error::{ArtifactError, TransformError};
use serde::Deserialize;
use std::path::Path;

/// Standardization with per-feature mean and scale fitted offline.
///
/// Maps `x` to `(x - mean) / scale`. A zero scale marks a constant feature
/// during fitting and is treated as 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Deserialize)]
struct ScalerParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        if mean.is_empty() {
            return Err(ArtifactError::InvalidTransform(
                "scaler has no fitted features".to_string(),
            ));
        }
        if mean.len() != scale.len() {
            return Err(ArtifactError::InvalidTransform(format!(
                "scaler has {} means but {} scales",
                mean.len(),
                scale.len()
            )));
        }
        if let Some(bad) = mean.iter().chain(&scale).find(|v| !v.is_finite()) {
            return Err(ArtifactError::InvalidTransform(format!(
                "non-finite fitted parameter {}",
                bad
            )));
        }
        if let Some(bad) = scale.iter().find(|v| **v < 0.0) {
            return Err(ArtifactError::InvalidTransform(format!(
                "negative scale {}",
                bad
            )));
        }

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }

    /// Parse a `{"mean": [...], "scale": [...]}` artifact
    pub fn from_json_slice(bytes: &[u8], path: &Path) -> Result<Self, ArtifactError> {
        let params: ScalerParams =
            serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(params.mean, params.scale)
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }
}

impl Transform for StandardScaler {
    fn input_width(&self) -> Option<usize> {
        Some(self.mean.len())
    }

    fn apply(&self, row: &[f64]) -> Result<Vec<f64>, TransformError> {
        if row.len() != self.mean.len() {
            return Err(TransformError::WidthMismatch {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }

        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(index, (&value, (mean, scale)))| {
                if value.is_finite() {
                    Ok((value - mean) / scale)
                } else {
                    Err(TransformError::NonFinite { index, value })
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "standard_scaler"
    }
}

/// Pass-through for models trained on raw features
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl Transform for IdentityTransform {
    fn input_width(&self) -> Option<usize> {
        None
    }

    fn apply(&self, row: &[f64]) -> Result<Vec<f64>, TransformError> {
        match row.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(TransformError::NonFinite {
                index,
                value: row[index],
            }),
            None => Ok(row.to_vec()),
        }
    }

    fn name(&self) -> &str {
        "identity"
    }
}
