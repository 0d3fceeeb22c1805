//! Scaler and classifier backends restored from a serialized artifact

use crate::error::{ArtifactError, InferenceError};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Normalization fitted offline
pub trait Scaler: Send + Sync {
    /// Number of input columns the scaler was fitted on
    fn n_features(&self) -> usize;

    fn transform(&self, input: ArrayView1<f64>) -> Result<Array1<f64>, InferenceError>;
}

/// Binary classifier over normalized vectors
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Probability distribution `[p_retain, p_churn]`
    fn predict_proba(&self, input: ArrayView1<f64>) -> Result<[f64; 2], InferenceError>;

    /// Argmax label, `1` meaning churn
    fn predict(&self, input: ArrayView1<f64>) -> Result<u8, InferenceError> {
        let [retain, churn] = self.predict_proba(input)?;
        Ok(u8::from(churn > retain))
    }

    fn name(&self) -> &str;
}

fn check_dimension(expected: usize, input: &ArrayView1<f64>) -> Result<(), InferenceError> {
    if input.len() != expected {
        return Err(InferenceError::DimensionMismatch {
            expected,
            actual: input.len(),
        });
    }
    Ok(())
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Z-score scaler: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        }
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, input: ArrayView1<f64>) -> Result<Array1<f64>, InferenceError> {
        check_dimension(self.mean.len(), &input)?;
        Ok((&input - &self.mean) / &self.scale)
    }
}

/// Min-max scaler mapping each column onto `[0, 1]` over its training range
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    range: Array1<f64>,
}

impl MinMaxScaler {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        let min = Array1::from(min);
        let max = Array1::from(max);
        // constant columns map to 0 instead of dividing by zero
        let range = (&max - &min).mapv(|r| if r > 0.0 { r } else { 1.0 });
        Self { min, range }
    }
}

impl Scaler for MinMaxScaler {
    fn n_features(&self) -> usize {
        self.min.len()
    }

    fn transform(&self, input: ArrayView1<f64>) -> Result<Array1<f64>, InferenceError> {
        check_dimension(self.min.len(), &input)?;
        Ok((&input - &self.min) / &self.range)
    }
}

/// Logistic regression: `p_churn = sigmoid(w·x + b)`
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients: Array1::from(coefficients),
            intercept,
        }
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, input: ArrayView1<f64>) -> Result<[f64; 2], InferenceError> {
        check_dimension(self.coefficients.len(), &input)?;
        let churn = sigmoid(self.coefficients.dot(&input) + self.intercept);
        Ok([1.0 - churn, churn])
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

/// One node of a pre-order serialized regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `x[feature] < threshold`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Leaf value reached by `input`. Assumes the tree passed `validate`.
    fn leaf_value(&self, input: &ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if input[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Children must point forward, which also rules out cycles
    fn validate(&self, tree_idx: usize, n_features: usize) -> Result<(), ArtifactError> {
        let field = format!("model.trees[{}]", tree_idx);
        if self.nodes.is_empty() {
            return Err(ArtifactError::InvalidValue {
                field,
                reason: "tree has no nodes".to_string(),
            });
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ArtifactError::InvalidValue {
                            field,
                            reason: format!("node {} has a non-finite leaf value", idx),
                        });
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ArtifactError::InvalidValue {
                            field,
                            reason: format!(
                                "node {} splits on feature {} but only {} features exist",
                                idx, feature, n_features
                            ),
                        });
                    }
                    if threshold.is_nan() {
                        return Err(ArtifactError::InvalidValue {
                            field,
                            reason: format!("node {} has a NaN threshold", idx),
                        });
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ArtifactError::InvalidValue {
                                field,
                                reason: format!("node {} has invalid child index {}", idx, child),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Additive tree ensemble: `p_churn = sigmoid(base_score + Σ leaf)`
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoosting {
    n_features: usize,
    base_score: f64,
    trees: Vec<Tree>,
}

impl GradientBoosting {
    pub fn new(
        n_features: usize,
        base_score: f64,
        trees: Vec<Tree>,
    ) -> Result<Self, ArtifactError> {
        if trees.is_empty() {
            return Err(ArtifactError::InvalidValue {
                field: "model.trees".to_string(),
                reason: "ensemble has no trees".to_string(),
            });
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(i, n_features)?;
        }
        Ok(Self {
            n_features,
            base_score,
            trees,
        })
    }
}

impl Classifier for GradientBoosting {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, input: ArrayView1<f64>) -> Result<[f64; 2], InferenceError> {
        check_dimension(self.n_features, &input)?;
        let margin = self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.leaf_value(&input))
                .sum::<f64>();
        let churn = sigmoid(margin);
        Ok([1.0 - churn, churn])
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }
}

/// Serialized scaler parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerSpec {
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    MinMax { min: Vec<f64>, max: Vec<f64> },
}

impl ScalerSpec {
    /// Check shapes against `n_features` and build the scaler
    pub fn build(self, n_features: usize) -> Result<Box<dyn Scaler>, ArtifactError> {
        match self {
            ScalerSpec::Standard { mean, scale } => {
                expect_len("scaler.mean", &mean, n_features)?;
                expect_len("scaler.scale", &scale, n_features)?;
                expect_finite("scaler.mean", &mean)?;
                expect_finite("scaler.scale", &scale)?;
                if let Some(i) = scale.iter().position(|&s| s == 0.0) {
                    return Err(ArtifactError::InvalidValue {
                        field: "scaler.scale".to_string(),
                        reason: format!("entry {} is zero", i),
                    });
                }
                Ok(Box::new(StandardScaler::new(mean, scale)))
            }
            ScalerSpec::MinMax { min, max } => {
                expect_len("scaler.min", &min, n_features)?;
                expect_len("scaler.max", &max, n_features)?;
                expect_finite("scaler.min", &min)?;
                expect_finite("scaler.max", &max)?;
                if let Some(i) = min.iter().zip(&max).position(|(lo, hi)| lo > hi) {
                    return Err(ArtifactError::InvalidValue {
                        field: "scaler.max".to_string(),
                        reason: format!("entry {} is below its minimum", i),
                    });
                }
                Ok(Box::new(MinMaxScaler::new(min, max)))
            }
        }
    }
}

/// Serialized classifier parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    GradientBoosting {
        #[serde(default)]
        base_score: f64,
        trees: Vec<Tree>,
    },
}

impl ClassifierSpec {
    pub fn build(self, n_features: usize) -> Result<Box<dyn Classifier>, ArtifactError> {
        match self {
            ClassifierSpec::LogisticRegression {
                coefficients,
                intercept,
            } => {
                expect_len("model.coefficients", &coefficients, n_features)?;
                expect_finite("model.coefficients", &coefficients)?;
                expect_finite("model.intercept", &[intercept])?;
                Ok(Box::new(LogisticRegression::new(coefficients, intercept)))
            }
            ClassifierSpec::GradientBoosting { base_score, trees } => {
                expect_finite("model.base_score", &[base_score])?;
                Ok(Box::new(GradientBoosting::new(n_features, base_score, trees)?))
            }
        }
    }
}

fn expect_len<T>(field: &str, values: &[T], expected: usize) -> Result<(), ArtifactError> {
    if values.len() != expected {
        return Err(ArtifactError::ShapeMismatch {
            field: field.to_string(),
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

fn expect_finite(field: &str, values: &[f64]) -> Result<(), ArtifactError> {
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(ArtifactError::InvalidValue {
            field: field.to_string(),
            reason: format!("entry {} is not finite", i),
        });
    }
    Ok(())
}
