//! Immutable prediction result handed to callers

use crate::features::FeatureVector;
use crate::risk::{ChurnLabel, RiskTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one prediction. Built once, never mutated; a newer prediction
/// supersedes it rather than updating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    features: FeatureVector,
    churn_probability: f64,
    retain_probability: f64,
    label: ChurnLabel,
    tier: RiskTier,
    recommendations: Vec<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    imputed_features: Vec<String>,
}

impl PredictionRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        features: FeatureVector,
        churn_probability: f64,
        retain_probability: f64,
        label: ChurnLabel,
        tier: RiskTier,
        recommendations: Vec<String>,
        created_at: DateTime<Utc>,
        imputed_features: Vec<String>,
    ) -> Self {
        Self {
            features,
            churn_probability,
            retain_probability,
            label,
            tier,
            recommendations,
            created_at,
            imputed_features,
        }
    }

    /// Input exactly as supplied, before alignment
    pub fn features(&self) -> &FeatureVector {
        &self.features
    }

    pub fn churn_probability(&self) -> f64 {
        self.churn_probability
    }

    pub fn retain_probability(&self) -> f64 {
        self.retain_probability
    }

    pub fn label(&self) -> ChurnLabel {
        self.label
    }

    pub fn tier(&self) -> RiskTier {
        self.tier
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Expected features that were absent and scored as zero
    pub fn imputed_features(&self) -> &[String] {
        &self.imputed_features
    }

    /// First `n` recommendations and whether more exist
    pub fn top_recommendations(&self, n: usize) -> (&[String], bool) {
        let shown = n.min(self.recommendations.len());
        (
            &self.recommendations[..shown],
            self.recommendations.len() > shown,
        )
    }
}
