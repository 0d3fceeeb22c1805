//! Churnwatch: customer churn risk scoring for e-commerce
//!
//! This library turns a customer's behavioural features into a churn
//! probability using a pre-trained model artifact, assigns a risk tier and
//! produces ordered retention recommendations.

pub mod align;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod predictor;
pub mod recommend;
pub mod record;
pub mod report;
pub mod risk;
pub mod viz;

// Re-export public items for easier access
pub use align::{align, align_with_report, Alignment};
pub use artifact::{discover_artifact, EvaluationMetadata, ModelArtifact};
pub use cli::Args;
pub use config::{load_and_resolve, ChurnConfig, ResolvedConfig};
pub use data::{load_customer_batch, load_profile_json, CustomerBatch};
pub use error::{ArtifactError, InferenceError, PredictError, ValidationError};
pub use features::{validate_features, CustomerProfile, FeatureVector, FEATURE_NAMES};
pub use model::{Classifier, Scaler};
pub use predictor::{ChurnPredictor, MissingFeaturePolicy};
pub use recommend::{RecommendationEngine, RecommendationRule};
pub use record::PredictionRecord;
pub use report::{ModelReport, RiskFactorAnalysis};
pub use risk::{ChurnLabel, Classification, RiskClassifier, RiskTier};
pub use viz::generate_visualization_report;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
