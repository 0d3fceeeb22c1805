//! Command-line interface definitions and argument parsing

use crate::features::FeatureVector;
use clap::Parser;
use std::path::PathBuf;

/// Customer churn risk scoring with retention recommendations
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the model artifact JSON (default: search standard locations)
    #[arg(short, long)]
    pub artifact: Option<PathBuf>,

    /// Path to a config file (default: .churnwatchrc.json or churnwatch.config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Score one customer given as comma-separated Name=value pairs
    /// Example: --predict "Age=42,Customer_Service_Calls=7,Cart_Abandonment_Rate=65"
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Score one customer read from a JSON object
    #[arg(short, long, conflicts_with = "predict")]
    pub input: Option<PathBuf>,

    /// Score every row of a CSV file whose headers are feature names
    #[arg(short, long)]
    pub batch: Option<PathBuf>,

    /// Print the model evaluation report
    #[arg(short, long)]
    pub report: bool,

    /// Write SVG charts into this directory
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Emit prediction records as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Fail requests that are missing any model feature
    #[arg(long)]
    pub strict: bool,

    /// Number of recommendations to display, at least 1 (overrides config)
    #[arg(long, value_parser = parse_top)]
    pub top: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_top(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Args {
    /// Parse feature values from the predict string
    /// Expected format: "Name=value,Name=value,..."
    pub fn parse_feature_values(&self) -> crate::Result<Option<FeatureVector>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let mut features = FeatureVector::new();
        for part in predict_str.split(',').filter(|p| !p.trim().is_empty()) {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Expected Name=value, got: {}", part.trim()))?;

            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("Missing feature name in: {}", part.trim());
            }
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid value for {}: {}", name, value.trim()))?;

            if features.insert(name.to_string(), value).is_some() {
                anyhow::bail!("Feature {} given more than once", name);
            }
        }

        if features.is_empty() {
            anyhow::bail!("Predict values must be in format 'Name=value,Name=value'");
        }

        Ok(Some(features))
    }

    /// True when no action flag was given
    pub fn nothing_requested(&self) -> bool {
        self.predict.is_none()
            && self.input.is_none()
            && self.batch.is_none()
            && !self.report
            && self.plot.is_none()
    }
}
