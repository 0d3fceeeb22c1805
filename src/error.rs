//! Typed errors for the artifact, validation and inference boundaries

use std::path::PathBuf;
use thiserror::Error;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while locating, parsing or validating a model artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model artifact not found; place it at one of: {}", join_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("failed to read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("artifact is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("artifact field `{field}` has length {actual}, expected {expected}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("artifact field `{field}` is invalid: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors raised when customer features fail boundary validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("feature {feature} is not a finite number")]
    NotFinite { feature: String },
    #[error("feature {feature} must be non-negative (got {value})")]
    Negative { feature: String, value: f64 },
    #[error("feature {feature} must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
}

/// Errors raised while invoking the scaler or classifier
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("input has {actual} features, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("probabilities do not sum to 1 (retain={retain}, churn={churn})")]
    InvalidDistribution { retain: f64, churn: f64 },
    #[error("non-finite value produced by {stage}")]
    NonFinite { stage: &'static str },
    #[error("model backend failed: {0}")]
    Backend(String),
}

/// Errors surfaced by a single prediction request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}
