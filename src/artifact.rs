//! Model artifact loading, discovery and load-time validation
//!
//! The artifact is a JSON document holding the ordered feature names, the
//! fitted scaler, the trained classifier and optional evaluation metadata.
//! It is loaded once at startup and shared read-only as `Arc<ModelArtifact>`.

use crate::error::ArtifactError;
use crate::model::{Classifier, ClassifierSpec, Scaler, ScalerSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Candidate locations checked, in order, when no path is configured
pub const DEFAULT_ARTIFACT_PATHS: [&str; 4] = [
    "churn_model_final.json",
    "models/churn_model_final.json",
    "churn_model.json",
    "models/churn_model.json",
];

/// One row of the offline model comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model: String,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default)]
    pub recall: Option<f64>,
    #[serde(default)]
    pub f1_score: Option<f64>,
    #[serde(default)]
    pub roc_auc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub features: Vec<String>,
    pub importances: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
}

/// Evaluation metadata recorded at training time. Reporting only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetadata {
    pub model_name: Option<String>,
    pub accuracy: Option<f64>,
    pub all_results: Vec<ModelScore>,
    pub feature_importance: Option<FeatureImportance>,
    pub confusion_matrix: Option<[[u64; 2]; 2]>,
    pub confusion_labels: Option<[String; 2]>,
    pub roc_curve: Option<RocCurve>,
    pub pr_curve: Option<PrCurve>,
}

impl EvaluationMetadata {
    pub fn confusion_labels(&self) -> [String; 2] {
        self.confusion_labels
            .clone()
            .unwrap_or_else(|| ["Retain (0)".to_string(), "Churn (1)".to_string()])
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if let Some(fi) = &self.feature_importance {
            if fi.importances.len() != fi.features.len() {
                return Err(ArtifactError::ShapeMismatch {
                    field: "feature_importance.importances".to_string(),
                    expected: fi.features.len(),
                    actual: fi.importances.len(),
                });
            }
        }
        if let Some(roc) = &self.roc_curve {
            if roc.tpr.len() != roc.fpr.len() {
                return Err(ArtifactError::ShapeMismatch {
                    field: "roc_curve.tpr".to_string(),
                    expected: roc.fpr.len(),
                    actual: roc.tpr.len(),
                });
            }
        }
        if let Some(pr) = &self.pr_curve {
            if pr.recall.len() != pr.precision.len() {
                return Err(ArtifactError::ShapeMismatch {
                    field: "pr_curve.recall".to_string(),
                    expected: pr.precision.len(),
                    actual: pr.recall.len(),
                });
            }
        }
        Ok(())
    }
}

/// On-disk layout. Required fields are optional here so that absence can be
/// reported by name instead of as a generic parse error.
#[derive(Debug, Deserialize)]
struct RawArtifact {
    feature_names: Option<Vec<String>>,
    scaler: Option<ScalerSpec>,
    model: Option<ClassifierSpec>,
    model_name: Option<String>,
    accuracy: Option<f64>,
    #[serde(default)]
    all_results: Vec<ModelScore>,
    feature_importance: Option<FeatureImportance>,
    confusion_matrix: Option<[[u64; 2]; 2]>,
    confusion_labels: Option<[String; 2]>,
    roc_curve: Option<RocCurve>,
    pr_curve: Option<PrCurve>,
}

/// Immutable bundle of feature order, scaler, classifier and metadata
pub struct ModelArtifact {
    feature_names: Vec<String>,
    scaler: Box<dyn Scaler>,
    model: Box<dyn Classifier>,
    metadata: EvaluationMetadata,
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("feature_names", &self.feature_names)
            .field("model", &self.model.name())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl ModelArtifact {
    /// Assemble an artifact from already-built parts, checking that every
    /// component agrees on the feature count
    pub fn new(
        feature_names: Vec<String>,
        scaler: Box<dyn Scaler>,
        model: Box<dyn Classifier>,
        metadata: EvaluationMetadata,
    ) -> Result<Self, ArtifactError> {
        if feature_names.is_empty() {
            return Err(ArtifactError::InvalidValue {
                field: "feature_names".to_string(),
                reason: "must list at least one feature".to_string(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = feature_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ArtifactError::InvalidValue {
                field: "feature_names".to_string(),
                reason: format!("duplicate feature name {}", dup),
            });
        }
        let n = feature_names.len();
        if scaler.n_features() != n {
            return Err(ArtifactError::ShapeMismatch {
                field: "scaler".to_string(),
                expected: n,
                actual: scaler.n_features(),
            });
        }
        if model.n_features() != n {
            return Err(ArtifactError::ShapeMismatch {
                field: "model".to_string(),
                expected: n,
                actual: model.n_features(),
            });
        }
        metadata.validate()?;

        Ok(Self {
            feature_names,
            scaler,
            model,
            metadata,
        })
    }

    /// Parse and validate an artifact from JSON text
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let raw: RawArtifact = serde_json::from_str(json)?;

        let feature_names = raw
            .feature_names
            .ok_or(ArtifactError::MissingField("feature_names"))?;
        let scaler_spec = raw.scaler.ok_or(ArtifactError::MissingField("scaler"))?;
        let model_spec = raw.model.ok_or(ArtifactError::MissingField("model"))?;

        let n = feature_names.len();
        let scaler = scaler_spec.build(n)?;
        let model = model_spec.build(n)?;

        let metadata = EvaluationMetadata {
            model_name: raw.model_name,
            accuracy: raw.accuracy,
            all_results: raw.all_results,
            feature_importance: raw.feature_importance,
            confusion_matrix: raw.confusion_matrix,
            confusion_labels: raw.confusion_labels,
            roc_curve: raw.roc_curve,
            pr_curve: raw.pr_curve,
        };

        Self::new(feature_names, scaler, model, metadata)
    }

    /// Read and validate an artifact file
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_json(&json)?;
        log::info!(
            "Loaded model artifact {} ({}, {} features)",
            path.display(),
            artifact.model_name(),
            artifact.n_features()
        );
        Ok(artifact)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn metadata(&self) -> &EvaluationMetadata {
        &self.metadata
    }

    /// Recorded model name, falling back to the backend kind
    pub fn model_name(&self) -> &str {
        self.metadata
            .model_name
            .as_deref()
            .unwrap_or_else(|| self.model.name())
    }
}

/// Resolve the artifact path: an explicit path must exist, otherwise the
/// default candidates under `base_dir` are tried in order
pub fn discover_artifact(
    explicit: Option<&Path>,
    base_dir: &Path,
) -> Result<PathBuf, ArtifactError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ArtifactError::NotFound {
            searched: vec![path.to_path_buf()],
        });
    }

    let candidates: Vec<PathBuf> = DEFAULT_ARTIFACT_PATHS
        .iter()
        .map(|candidate| base_dir.join(candidate))
        .collect();

    match candidates.iter().find(|path| path.exists()) {
        Some(path) => Ok(path.clone()),
        None => Err(ArtifactError::NotFound {
            searched: candidates,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TINY_ARTIFACT: &str = r#"{
        "feature_names": ["a", "b"],
        "scaler": {"kind": "standard", "mean": [0.0, 0.0], "scale": [1.0, 1.0]},
        "model": {"kind": "logistic_regression", "coefficients": [1.0, -1.0], "intercept": 0.0},
        "model_name": "Logistic",
        "accuracy": 0.91,
        "confusion_matrix": [[50, 5], [7, 38]]
    }"#;

    #[test]
    fn test_from_json() {
        let artifact = ModelArtifact::from_json(TINY_ARTIFACT).unwrap();
        assert_eq!(artifact.feature_names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(artifact.model_name(), "Logistic");
        assert_eq!(artifact.metadata().accuracy, Some(0.91));
        assert_eq!(artifact.metadata().confusion_matrix, Some([[50, 5], [7, 38]]));
        assert_eq!(
            artifact.metadata().confusion_labels(),
            ["Retain (0)".to_string(), "Churn (1)".to_string()]
        );
    }

    #[test]
    fn test_missing_required_field_is_named() {
        for field in ["feature_names", "scaler", "model"] {
            let mut value: serde_json::Value = serde_json::from_str(TINY_ARTIFACT).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let err = ModelArtifact::from_json(&value.to_string()).unwrap_err();
            assert!(
                matches!(err, ArtifactError::MissingField(name) if name == field),
                "expected missing {}, got {}",
                field,
                err
            );
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let json = TINY_ARTIFACT.replace(
            r#""coefficients": [1.0, -1.0]"#,
            r#""coefficients": [1.0]"#,
        );
        let err = ModelArtifact::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::ShapeMismatch {
                ref field,
                expected: 2,
                actual: 1
            } if field == "model.coefficients"
        ));
    }

    #[test]
    fn test_duplicate_feature_names_rejected() {
        let json = TINY_ARTIFACT.replace(r#"["a", "b"]"#, r#"["a", "a"]"#);
        assert!(matches!(
            ModelArtifact::from_json(&json),
            Err(ArtifactError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            ModelArtifact::from_json("{not json"),
            Err(ArtifactError::Parse(_))
        ));
    }

    #[test]
    fn test_discover_prefers_first_candidate() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("models")).unwrap();
        fs::write(dir.path().join("models/churn_model_final.json"), TINY_ARTIFACT).unwrap();
        fs::write(dir.path().join("churn_model.json"), TINY_ARTIFACT).unwrap();

        let found = discover_artifact(None, dir.path()).unwrap();
        assert_eq!(found, dir.path().join("models/churn_model_final.json"));
    }

    #[test]
    fn test_discover_reports_searched_paths() {
        let dir = tempdir().unwrap();
        match discover_artifact(None, dir.path()) {
            Err(ArtifactError::NotFound { searched }) => assert_eq!(searched.len(), 4),
            other => panic!("unexpected result: {:?}", other),
        }

        let explicit = dir.path().join("custom.json");
        assert!(discover_artifact(Some(&explicit), dir.path()).is_err());
        fs::write(&explicit, TINY_ARTIFACT).unwrap();
        assert_eq!(discover_artifact(Some(&explicit), dir.path()).unwrap(), explicit);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("churn_model.json");
        fs::write(&path, TINY_ARTIFACT).unwrap();
        let artifact = ModelArtifact::load(&path).unwrap();
        assert_eq!(artifact.n_features(), 2);

        assert!(matches!(
            ModelArtifact::load(&dir.path().join("absent.json")),
            Err(ArtifactError::Io { .. })
        ));
    }
}
