//! Churn probability inference and risk tier mapping

use crate::artifact::ModelArtifact;
use crate::error::InferenceError;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Tolerance allowed on `p_retain + p_churn == 1`
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

pub const CRITICAL_THRESHOLD: f64 = 0.70;
pub const HIGH_THRESHOLD: f64 = 0.50;
pub const MODERATE_THRESHOLD: f64 = 0.30;

/// Severity bucket derived from churn probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Moderate,
        RiskTier::High,
        RiskTier::Critical,
    ];

    /// Step function over churn probability; each threshold is inclusive and
    /// higher thresholds are checked first
    pub fn from_probability(churn_probability: f64) -> Self {
        if churn_probability >= CRITICAL_THRESHOLD {
            RiskTier::Critical
        } else if churn_probability >= HIGH_THRESHOLD {
            RiskTier::High
        } else if churn_probability >= MODERATE_THRESHOLD {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        }
    }

    /// 0 for Low up to 3 for Critical
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    /// Hex colour used when rendering the tier
    pub fn color(&self) -> &'static str {
        match self {
            RiskTier::Low => "#2ecc71",
            RiskTier::Moderate => "#3498db",
            RiskTier::High => "#f39c12",
            RiskTier::Critical => "#e74c3c",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Predicted class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnLabel {
    Retain,
    Churn,
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChurnLabel::Retain => f.write_str("Expected to stay"),
            ChurnLabel::Churn => f.write_str("Expected to churn"),
        }
    }
}

/// Output of one classifier invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: ChurnLabel,
    pub churn_probability: f64,
    pub retain_probability: f64,
    pub tier: RiskTier,
}

/// Runs the artifact's scaler and classifier on aligned vectors
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    artifact: Arc<ModelArtifact>,
}

impl RiskClassifier {
    pub fn new(artifact: Arc<ModelArtifact>) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Score one dense vector laid out in the artifact's feature order.
    ///
    /// Any failure is returned as-is; no default prediction is substituted.
    pub fn classify(&self, vector: &Array1<f64>) -> Result<Classification, InferenceError> {
        let expected = self.artifact.n_features();
        if vector.len() != expected {
            return Err(InferenceError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let scaled = self.artifact.scaler().transform(vector.view())?;
        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::NonFinite { stage: "scaler" });
        }

        let model = self.artifact.model();
        let [retain, churn] = model.predict_proba(scaled.view())?;
        if !retain.is_finite() || !churn.is_finite() {
            return Err(InferenceError::NonFinite { stage: "model" });
        }
        let in_unit = |p: f64| (0.0..=1.0).contains(&p);
        if !in_unit(retain)
            || !in_unit(churn)
            || (retain + churn - 1.0).abs() > PROBABILITY_SUM_TOLERANCE
        {
            return Err(InferenceError::InvalidDistribution { retain, churn });
        }

        let label = match model.predict(scaled.view())? {
            0 => ChurnLabel::Retain,
            _ => ChurnLabel::Churn,
        };

        Ok(Classification {
            label,
            churn_probability: churn,
            retain_probability: retain,
            tier: RiskTier::from_probability(churn),
        })
    }
}
