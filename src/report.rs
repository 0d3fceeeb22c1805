//! Model evaluation summaries and per-customer risk factor analysis

use crate::artifact::{ModelArtifact, ModelScore};
use crate::features::{
    FeatureVector, CART_ABANDONMENT_RATE, CUSTOMER_SERVICE_CALLS, DAYS_SINCE_LAST_PURCHASE,
    EMAIL_OPEN_RATE, LIFETIME_VALUE, TOTAL_PURCHASES,
};
use crate::record::PredictionRecord;
use serde::Serialize;
use std::cmp::Ordering;

/// A feature value compared against a reference limit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorFinding {
    pub feature: &'static str,
    pub value: f64,
    pub limit: f64,
}

/// (feature, limit): value above the limit is a churn warning sign
const RISK_FACTORS: [(&str, f64); 3] = [
    (CUSTOMER_SERVICE_CALLS, 5.0),
    (CART_ABANDONMENT_RATE, 60.0),
    (DAYS_SINCE_LAST_PURCHASE, 60.0),
];

/// (feature, limit): value above the limit is a retention strength
const STRENGTHS: [(&str, f64); 3] = [
    (LIFETIME_VALUE, 1500.0),
    (TOTAL_PURCHASES, 10.0),
    (EMAIL_OPEN_RATE, 30.0),
];

/// Warning signs and strengths found in one customer's features
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskFactorAnalysis {
    pub risk_factors: Vec<FactorFinding>,
    pub strengths: Vec<FactorFinding>,
}

impl RiskFactorAnalysis {
    pub fn from_features(features: &FeatureVector) -> Self {
        let above = |table: &[(&'static str, f64)]| {
            table
                .iter()
                .filter_map(|&(feature, limit)| {
                    let value = features.get(feature).copied()?;
                    (value > limit).then_some(FactorFinding {
                        feature,
                        value,
                        limit,
                    })
                })
                .collect::<Vec<_>>()
        };

        Self {
            risk_factors: above(&RISK_FACTORS),
            strengths: above(&STRENGTHS),
        }
    }
}

/// Offline evaluation summary of the loaded artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    pub model_name: String,
    pub accuracy: Option<f64>,
    pub n_features: usize,
    /// Comparison table sorted by ROC-AUC, best first; rows without AUC last
    pub ranked_results: Vec<ModelScore>,
    /// (feature, importance), most important first
    pub feature_importance: Vec<(String, f64)>,
    pub confusion_matrix: Option<[[u64; 2]; 2]>,
    pub confusion_labels: [String; 2],
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl ModelReport {
    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        let metadata = artifact.metadata();

        let mut ranked_results = metadata.all_results.clone();
        ranked_results.sort_by(|a, b| descending(a.roc_auc, b.roc_auc));

        let mut feature_importance: Vec<(String, f64)> = metadata
            .feature_importance
            .as_ref()
            .map(|fi| {
                fi.features
                    .iter()
                    .cloned()
                    .zip(fi.importances.iter().copied())
                    .collect()
            })
            .unwrap_or_default();
        feature_importance.sort_by(|a, b| descending(Some(a.1), Some(b.1)));

        Self {
            model_name: artifact.model_name().to_string(),
            accuracy: metadata.accuracy,
            n_features: artifact.n_features(),
            ranked_results,
            feature_importance,
            confusion_matrix: metadata.confusion_matrix,
            confusion_labels: metadata.confusion_labels(),
        }
    }

    pub fn best_model(&self) -> Option<&ModelScore> {
        self.ranked_results.first()
    }
}

fn metric(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "-".to_string())
}

/// Print the model evaluation summary to console
pub fn print_model_report(report: &ModelReport) {
    println!("\n=== Model Analysis ===");
    println!("Model: {}", report.model_name);
    if let Some(accuracy) = report.accuracy {
        println!("Accuracy: {:.2}%", accuracy * 100.0);
    }
    println!("Features used: {}", report.n_features);

    if !report.ranked_results.is_empty() {
        println!("\nModel comparison (sorted by ROC-AUC):");
        println!(
            "  {:<24} | {:>8} | {:>9} | {:>8} | {:>8} | {:>8}",
            "Model", "Accuracy", "Precision", "Recall", "F1", "ROC-AUC"
        );
        println!("  {}", "-".repeat(80));
        for row in &report.ranked_results {
            println!(
                "  {:<24} | {:>8} | {:>9} | {:>8} | {:>8} | {:>8}",
                row.model,
                metric(row.accuracy),
                metric(row.precision),
                metric(row.recall),
                metric(row.f1_score),
                metric(row.roc_auc)
            );
        }
        if let Some(best) = report.best_model() {
            println!(
                "\nBest model: {} (ROC-AUC {}, Accuracy {}, F1 {})",
                best.model,
                metric(best.roc_auc),
                metric(best.accuracy),
                metric(best.f1_score)
            );
        }
    }

    if !report.feature_importance.is_empty() {
        println!("\nFeature importance:");
        for (rank, (feature, importance)) in report.feature_importance.iter().enumerate() {
            println!("  {:>2}. {:<26} {:>6.2}%", rank + 1, feature, importance * 100.0);
        }
    }

    if let Some(cm) = report.confusion_matrix {
        let [retain, churn] = &report.confusion_labels;
        println!("\nConfusion matrix (rows: actual, columns: predicted):");
        println!("  {:<12} | {:>12} | {:>12}", "", retain, churn);
        println!("  {:<12} | {:>12} | {:>12}", retain, cm[0][0], cm[0][1]);
        println!("  {:<12} | {:>12} | {:>12}", churn, cm[1][0], cm[1][1]);
    }
}

/// Print one prediction with its leading recommendations
pub fn print_prediction(record: &PredictionRecord, top: usize) {
    println!("\n=== Prediction Result ===");
    println!("Outcome: {}", record.label());
    println!("Churn probability:  {:.2}%", record.churn_probability() * 100.0);
    println!("Retain probability: {:.2}%", record.retain_probability() * 100.0);
    println!("Risk level: {}", record.tier());

    if !record.imputed_features().is_empty() {
        println!(
            "Note: scored with missing features filled as 0: {}",
            record.imputed_features().join(", ")
        );
    }

    let (shown, more) = record.top_recommendations(top);
    println!("\nRecommended actions:");
    for (i, action) in shown.iter().enumerate() {
        println!("  {}. {}", i + 1, action);
    }
    if more {
        println!(
            "  ... {} more (use --top to show more)",
            record.recommendations().len() - shown.len()
        );
    }

    let analysis = RiskFactorAnalysis::from_features(record.features());
    if !analysis.risk_factors.is_empty() || !analysis.strengths.is_empty() {
        println!("\nRisk factors:");
        for f in &analysis.risk_factors {
            println!("  ! {}: {} (expected at most {})", f.feature, f.value, f.limit);
        }
        for f in &analysis.strengths {
            println!("  + {}: {} (above {})", f.feature, f.value, f.limit);
        }
    }

    println!(
        "\nPredicted at: {}",
        record.created_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_factor_analysis() {
        let mut features = FeatureVector::new();
        features.insert(CUSTOMER_SERVICE_CALLS.to_string(), 7.0);
        features.insert(CART_ABANDONMENT_RATE.to_string(), 60.0);
        features.insert(DAYS_SINCE_LAST_PURCHASE.to_string(), 90.0);
        features.insert(LIFETIME_VALUE.to_string(), 1800.0);
        features.insert(EMAIL_OPEN_RATE.to_string(), 12.0);

        let analysis = RiskFactorAnalysis::from_features(&features);
        let risks: Vec<&str> = analysis.risk_factors.iter().map(|f| f.feature).collect();
        assert_eq!(risks, vec![CUSTOMER_SERVICE_CALLS, DAYS_SINCE_LAST_PURCHASE]);
        assert_eq!(analysis.strengths.len(), 1);
        assert_eq!(analysis.strengths[0].feature, LIFETIME_VALUE);
        assert_eq!(analysis.strengths[0].limit, 1500.0);
    }

    #[test]
    fn test_empty_features_have_no_findings() {
        assert_eq!(
            RiskFactorAnalysis::from_features(&FeatureVector::new()),
            RiskFactorAnalysis::default()
        );
    }

    #[test]
    fn test_model_report_ranks_by_roc_auc() {
        let artifact = ModelArtifact::from_json(
            r#"{
                "feature_names": ["a", "b"],
                "scaler": {"kind": "min_max", "min": [0, 0], "max": [1, 1]},
                "model": {"kind": "logistic_regression", "coefficients": [0.5, 0.5], "intercept": 0},
                "all_results": [
                    {"model": "Logistic Regression", "accuracy": 0.81, "roc_auc": 0.85},
                    {"model": "Decision Tree", "accuracy": 0.78},
                    {"model": "XGBoost", "accuracy": 0.89, "roc_auc": 0.94},
                    {"model": "Random Forest", "accuracy": 0.88, "roc_auc": 0.93}
                ],
                "feature_importance": {"features": ["a", "b"], "importances": [0.2, 0.8]},
                "confusion_labels": ["Stay", "Leave"]
            }"#,
        )
        .unwrap();

        let report = ModelReport::from_artifact(&artifact);
        let order: Vec<&str> = report.ranked_results.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(
            order,
            vec!["XGBoost", "Random Forest", "Logistic Regression", "Decision Tree"]
        );
        assert_eq!(report.best_model().unwrap().model, "XGBoost");
        assert_eq!(report.feature_importance[0], ("b".to_string(), 0.8));
        assert_eq!(report.model_name, "logistic_regression");
        assert_eq!(report.confusion_labels, ["Stay".to_string(), "Leave".to_string()]);
    }
}
