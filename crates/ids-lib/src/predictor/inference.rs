//! Classifier backends
//!
//! `OnnxClassifier` runs an exported model through tract; `LinearClassifier`
//! evaluates a logistic model whose coefficients were exported as JSON.

use super::Classifier;
use crate::error::{ArtifactError, InferenceError};
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::debug;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX classifier evaluated with tract.
///
/// The graph takes one `f32[1, width]` input; its first output holds the
/// predicted label as an integer or float tensor.
pub struct OnnxClassifier {
    model: TractModel,
    width: usize,
}

impl OnnxClassifier {
    pub fn from_bytes(model_bytes: &[u8], width: usize) -> Result<Self, ArtifactError> {
        let model = Self::load_model(model_bytes, width)
            .map_err(|e| ArtifactError::InvalidClassifier(format!("{:#}", e)))?;
        debug!(width, size = model_bytes.len(), "ONNX classifier loaded");
        Ok(Self { model, width })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], width: usize) -> anyhow::Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn row_to_tensor(&self, row: &[f64]) -> Result<Tensor, InferenceError> {
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.width), data)
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        Ok(array.into())
    }

    fn tensor_to_label(output: &Tensor) -> Result<i64, InferenceError> {
        let backend = |e: TractError| InferenceError::Backend(e.to_string());
        let label = match output.datum_type() {
            DatumType::I64 => output.to_array_view::<i64>().map_err(backend)?.iter().next().copied(),
            DatumType::I32 => output
                .to_array_view::<i32>()
                .map_err(backend)?
                .iter()
                .next()
                .map(|v| *v as i64),
            DatumType::F32 => match output.to_array_view::<f32>().map_err(backend)?.iter().next() {
                Some(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
                Some(v) => {
                    return Err(InferenceError::UnexpectedOutput(format!(
                        "label {} is not a whole number",
                        v
                    )))
                }
                None => None,
            },
            other => {
                return Err(InferenceError::UnexpectedOutput(format!(
                    "{:?} output tensor",
                    other
                )))
            }
        };
        label.ok_or(InferenceError::MissingOutput)
    }
}

impl Classifier for OnnxClassifier {
    fn input_width(&self) -> Option<usize> {
        Some(self.width)
    }

    fn score(&self, row: &[f64]) -> Result<i64, InferenceError> {
        if row.len() != self.width {
            return Err(InferenceError::WidthMismatch {
                expected: self.width,
                actual: row.len(),
            });
        }

        let input = self.row_to_tensor(row)?;
        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        let output = result.first().ok_or(InferenceError::MissingOutput)?;
        Self::tensor_to_label(output)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Logistic model: label 1 when `sigmoid(w·x + b) >= threshold`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearClassifier {
    weights: Vec<f64>,
    intercept: f64,
    threshold: f64,
}

#[derive(Deserialize)]
struct LinearParams {
    weights: Vec<f64>,
    intercept: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl LinearClassifier {
    pub fn new(weights: Vec<f64>, intercept: f64, threshold: f64) -> Result<Self, ArtifactError> {
        if weights.is_empty() {
            return Err(ArtifactError::InvalidClassifier(
                "linear model has no weights".to_string(),
            ));
        }
        if weights.iter().any(|w| !w.is_finite()) || !intercept.is_finite() {
            return Err(ArtifactError::InvalidClassifier(
                "linear model has non-finite coefficients".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ArtifactError::InvalidClassifier(format!(
                "threshold {} is not a probability",
                threshold
            )));
        }
        Ok(Self {
            weights,
            intercept,
            threshold,
        })
    }

    /// Parse a `{"weights": [...], "intercept": b, "threshold": t}` artifact
    pub fn from_json_slice(bytes: &[u8], path: &Path) -> Result<Self, ArtifactError> {
        let params: LinearParams =
            serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(params.weights, params.intercept, params.threshold)
    }

    /// Probability of the intrusion class
    pub fn probability(&self, row: &[f64]) -> Result<f64, InferenceError> {
        if row.len() != self.weights.len() {
            return Err(InferenceError::WidthMismatch {
                expected: self.weights.len(),
                actual: row.len(),
            });
        }

        let z: f64 = self.intercept
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        if z.is_nan() {
            return Err(InferenceError::UnexpectedOutput(
                "decision value is NaN".to_string(),
            ));
        }
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for LinearClassifier {
    fn input_width(&self) -> Option<usize> {
        Some(self.weights.len())
    }

    fn score(&self, row: &[f64]) -> Result<i64, InferenceError> {
        let p = self.probability(row)?;
        Ok(if p >= self.threshold { 1 } else { 0 })
    }

    fn name(&self) -> &str {
        "linear"
    }
}
