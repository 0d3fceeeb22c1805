//! SVG charts for predictions and model evaluation using Plotters

use crate::artifact::{ModelArtifact, PrCurve, RocCurve};
use crate::record::PredictionRecord;
use crate::report::ModelReport;
use crate::risk::RiskTier;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const RETAIN_COLOR: RGBColor = RGBColor(0x2e, 0xcc, 0x71);
const CHURN_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
const ACCENT_COLOR: RGBColor = RGBColor(0x66, 0x7e, 0xea);

fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let digits = hex.strip_prefix('#').filter(|d| d.len() == 6)?;
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// Plotting colour of a risk tier
pub fn tier_color(tier: RiskTier) -> RGBColor {
    parse_hex_color(tier.color()).unwrap_or(CHURN_COLOR)
}

/// Retain vs churn probability bars for one prediction; the churn bar takes
/// the colour of the record's tier
pub fn create_probability_chart(
    record: &PredictionRecord,
    output_path: &Path,
) -> crate::Result<()> {
    let bars = [
        ("Retain", record.retain_probability() * 100.0, RETAIN_COLOR),
        ("Churn", record.churn_probability() * 100.0, tier_color(record.tier())),
    ];

    let root = SVGBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Prediction Probabilities ({} risk)", record.tier()),
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..2f64, 0f64..100f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2)
        .x_label_formatter(&|x| {
            bars.get(x.floor() as usize)
                .map(|(name, _, _)| name.to_string())
                .unwrap_or_default()
        })
        .y_desc("Probability (%)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, (_, value, color)) in bars.iter().enumerate() {
        let x = i as f64;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x + 0.2, 0.0), (x + 0.8, *value)],
            color.filled(),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.1}%", value),
            (x + 0.35, (*value + 4.0).min(98.0)),
            ("sans-serif", 14),
        )))?;
    }

    root.present()?;
    log::info!("Probability chart saved to: {}", output_path.display());

    Ok(())
}

/// Horizontal bars of feature importance, most important on top
pub fn create_feature_importance_chart(
    importance: &[(String, f64)],
    output_path: &Path,
) -> crate::Result<()> {
    if importance.is_empty() {
        anyhow::bail!("No feature importance recorded in the artifact");
    }

    let n = importance.len();
    let max_importance = importance
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(1e-9);

    let root = SVGBackend::new(output_path, (800, 60 + 28 * n as u32)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Importance", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(200)
        .build_cartesian_2d(0f64..(max_importance * 1.1), 0f64..(n as f64))?;

    // row 0 is drawn at the top
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|y| {
            let row = n.saturating_sub(1 + y.floor() as usize);
            importance
                .get(row)
                .map(|(name, _)| name.clone())
                .unwrap_or_default()
        })
        .x_desc("Importance")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(importance.iter().enumerate().map(|(row, (_, value))| {
        let y = (n - 1 - row) as f64;
        Rectangle::new([(0.0, y + 0.15), (*value, y + 0.85)], ACCENT_COLOR.filled())
    }))?;

    root.present()?;
    log::info!("Feature importance chart saved to: {}", output_path.display());

    Ok(())
}

/// Shared layout for curves drawn on the unit square
fn draw_unit_curve(
    output_path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: Vec<(f64, f64)>,
    diagonal: bool,
) -> crate::Result<()> {
    if points.is_empty() {
        anyhow::bail!("{} has no points to draw", title);
    }

    let root = SVGBackend::new(output_path, (500, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1f64, 0f64..1.05f64)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart
        .draw_series(LineSeries::new(points, ACCENT_COLOR.stroke_width(2)))?
        .label(title)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ACCENT_COLOR));

    if diagonal {
        chart
            .draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], &BLACK.mix(0.4)))?
            .label("Random")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.mix(0.4)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    log::info!("{} saved to: {}", title, output_path.display());

    Ok(())
}

pub fn create_roc_curve_chart(roc: &RocCurve, output_path: &Path) -> crate::Result<()> {
    let points = roc.fpr.iter().copied().zip(roc.tpr.iter().copied()).collect();
    draw_unit_curve(
        output_path,
        "ROC Curve",
        "False Positive Rate",
        "True Positive Rate",
        points,
        true,
    )
}

pub fn create_pr_curve_chart(pr: &PrCurve, output_path: &Path) -> crate::Result<()> {
    let points = pr
        .recall
        .iter()
        .copied()
        .zip(pr.precision.iter().copied())
        .collect();
    draw_unit_curve(
        output_path,
        "Precision-Recall Curve",
        "Recall",
        "Precision",
        points,
        false,
    )
}

/// Write every chart the available data supports into `output_dir`
///
/// # Returns
/// * Paths of the files written
pub fn generate_visualization_report(
    artifact: &ModelArtifact,
    record: Option<&PredictionRecord>,
    output_dir: &Path,
) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    if let Some(record) = record {
        let path = output_dir.join("prediction_probabilities.svg");
        create_probability_chart(record, &path)?;
        written.push(path);
    }

    let report = ModelReport::from_artifact(artifact);
    if !report.feature_importance.is_empty() {
        let path = output_dir.join("feature_importance.svg");
        create_feature_importance_chart(&report.feature_importance, &path)?;
        written.push(path);
    }

    let metadata = artifact.metadata();
    if let Some(roc) = metadata.roc_curve.as_ref().filter(|c| !c.fpr.is_empty()) {
        let path = output_dir.join("roc_curve.svg");
        create_roc_curve_chart(roc, &path)?;
        written.push(path);
    }
    if let Some(pr) = metadata.pr_curve.as_ref().filter(|c| !c.recall.is_empty()) {
        let path = output_dir.join("pr_curve.svg");
        create_pr_curve_chart(pr, &path)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::risk::{ChurnLabel, RiskTier};
    use chrono::Utc;
    use tempfile::tempdir;

    fn create_test_artifact() -> ModelArtifact {
        ModelArtifact::from_json(
            r#"{
                "feature_names": ["a", "b"],
                "scaler": {"kind": "standard", "mean": [0, 0], "scale": [1, 1]},
                "model": {"kind": "logistic_regression", "coefficients": [1, 1], "intercept": 0},
                "feature_importance": {"features": ["a", "b"], "importances": [0.3, 0.7]},
                "roc_curve": {"fpr": [0.0, 0.1, 0.4, 1.0], "tpr": [0.0, 0.6, 0.9, 1.0]},
                "pr_curve": {"precision": [1.0, 0.9, 0.7], "recall": [0.0, 0.5, 1.0]}
            }"#,
        )
        .unwrap()
    }

    fn create_test_record() -> PredictionRecord {
        PredictionRecord::new(
            FeatureVector::new(),
            0.64,
            0.36,
            ChurnLabel::Churn,
            RiskTier::High,
            vec!["act".to_string()],
            Utc::now(),
            Vec::new(),
        )
    }

    #[test]
    fn test_create_probability_chart() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("probabilities.svg");

        let result = create_probability_chart(&create_test_record(), &output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_tier_color() {
        assert_eq!(tier_color(RiskTier::Low), RGBColor(0x2e, 0xcc, 0x71));
        assert_eq!(tier_color(RiskTier::Moderate), RGBColor(0x34, 0x98, 0xdb));
        assert_eq!(tier_color(RiskTier::High), RGBColor(0xf3, 0x9c, 0x12));
        assert_eq!(tier_color(RiskTier::Critical), RGBColor(0xe7, 0x4c, 0x3c));
        assert_eq!(parse_hex_color("#12"), None);
        assert_eq!(parse_hex_color("3498db"), None);
    }

    #[test]
    fn test_probability_chart_uses_tier_color() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("probabilities.svg");

        create_probability_chart(&create_test_record(), &output_path).unwrap();
        let svg = std::fs::read_to_string(&output_path).unwrap().to_lowercase();
        assert!(svg.contains(RiskTier::High.color()));
        assert!(!svg.contains(RiskTier::Critical.color()));
    }

    #[test]
    fn test_create_roc_curve_chart() {
        let artifact = create_test_artifact();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("roc.svg");

        let roc = artifact.metadata().roc_curve.as_ref().unwrap();
        assert!(create_roc_curve_chart(roc, &output_path).is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_empty_importance_is_error() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("fi.svg");
        assert!(create_feature_importance_chart(&[], &output_path).is_err());
    }

    #[test]
    fn test_generate_visualization_report() {
        let artifact = create_test_artifact();
        let record = create_test_record();
        let temp_dir = tempdir().unwrap();

        let written =
            generate_visualization_report(&artifact, Some(&record), temp_dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        for path in &written {
            assert!(path.exists(), "{} not written", path.display());
        }
    }
}
