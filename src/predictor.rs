//! End-to-end prediction: validate, align, classify, recommend, record

use crate::align::align_with_report;
use crate::artifact::ModelArtifact;
use crate::error::{PredictError, ValidationError};
use crate::features::{validate_features, CustomerProfile, FeatureVector};
use crate::recommend::RecommendationEngine;
use crate::record::PredictionRecord;
use crate::risk::RiskClassifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when an expected feature is absent from the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFeaturePolicy {
    /// Score absent features as zero without comment
    ZeroFill,
    /// Score absent features as zero, log a warning and list them on the record
    #[default]
    Warn,
    /// Fail the request
    Reject,
}

/// Prediction pipeline bound to one artifact for its whole lifetime
#[derive(Debug, Clone)]
pub struct ChurnPredictor {
    classifier: RiskClassifier,
    engine: RecommendationEngine,
    policy: MissingFeaturePolicy,
}

impl ChurnPredictor {
    pub fn new(
        artifact: Arc<ModelArtifact>,
        engine: RecommendationEngine,
        policy: MissingFeaturePolicy,
    ) -> Self {
        Self {
            classifier: RiskClassifier::new(artifact),
            engine,
            policy,
        }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        self.classifier.artifact()
    }

    pub fn policy(&self) -> MissingFeaturePolicy {
        self.policy
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionRecord, PredictError> {
        self.predict_at(features, Utc::now())
    }

    pub fn predict_profile(
        &self,
        profile: &CustomerProfile,
    ) -> Result<PredictionRecord, PredictError> {
        self.predict(&profile.to_feature_vector())
    }

    /// Same as [`predict`](Self::predict) with an explicit creation time
    pub fn predict_at(
        &self,
        features: &FeatureVector,
        created_at: DateTime<Utc>,
    ) -> Result<PredictionRecord, PredictError> {
        validate_features(features)?;

        let alignment = align_with_report(features, self.artifact().feature_names());
        let imputed = match (self.policy, alignment.imputed.is_empty()) {
            (_, true) => Vec::new(),
            (MissingFeaturePolicy::Reject, false) => {
                return Err(ValidationError::MissingFeatures(alignment.imputed).into());
            }
            (MissingFeaturePolicy::Warn, false) => {
                log::warn!(
                    "Scoring with {} missing feature(s) filled as 0: {}",
                    alignment.imputed.len(),
                    alignment.imputed.join(", ")
                );
                alignment.imputed
            }
            (MissingFeaturePolicy::ZeroFill, false) => Vec::new(),
        };

        let result = self.classifier.classify(&alignment.vector)?;
        // rules read the raw input; absent keys count as zero, matching the aligned vector
        let recommendations = self.engine.recommend(result.tier, features);

        log::debug!(
            "churn={:.4} tier={} recommendations={}",
            result.churn_probability,
            result.tier,
            recommendations.len()
        );

        Ok(PredictionRecord::new(
            features.clone(),
            result.churn_probability,
            result.retain_probability,
            result.label,
            result.tier,
            recommendations,
            created_at,
            imputed,
        ))
    }

    /// Score each row independently; one failing row does not affect the rest
    pub fn predict_batch<'a, I>(&self, rows: I) -> Vec<Result<PredictionRecord, PredictError>>
    where
        I: IntoIterator<Item = &'a FeatureVector>,
    {
        let now = Utc::now();
        rows.into_iter().map(|row| self.predict_at(row, now)).collect()
    }
}
