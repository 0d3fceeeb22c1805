//! Churnwatch: customer churn risk scoring CLI
//!
//! This is the main entrypoint that loads configuration and the model
//! artifact, then runs the requested scoring, reporting and plotting modes.

use anyhow::{Context, Result};
use churnwatch::report::{print_model_report, print_prediction};
use churnwatch::{
    discover_artifact, load_and_resolve, load_customer_batch, load_profile_json, viz, Args,
    ArtifactError, ChurnPredictor, FeatureVector, MissingFeaturePolicy, ModelArtifact,
    ModelReport, PredictionRecord, ResolvedConfig, RiskTier,
};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let config = load_and_resolve(&cwd, args.config.as_deref())?;

    let explicit = args.artifact.as_deref().or(config.artifact.as_deref());
    let artifact = match discover_artifact(explicit, &cwd).and_then(|p| ModelArtifact::load(&p)) {
        Ok(artifact) => Arc::new(artifact),
        Err(err @ ArtifactError::NotFound { .. }) => {
            eprintln!("Error: {}", err);
            eprintln!("Train and export the churn model first, or pass --artifact <path>.");
            std::process::exit(2);
        }
        Err(err) => return Err(err).context("failed to load model artifact"),
    };

    let policy = if args.strict {
        MissingFeaturePolicy::Reject
    } else {
        config.missing_features
    };
    let predictor = ChurnPredictor::new(Arc::clone(&artifact), config.engine.clone(), policy);

    if args.nothing_requested() {
        run_report_mode(&artifact);
        println!("\nUse --predict, --input or --batch to score customers (see --help).");
        return Ok(());
    }

    if args.report {
        run_report_mode(&artifact);
    }

    let mut single = None;
    if let Some(features) = args.parse_feature_values()? {
        single = Some(run_prediction_mode(&args, &config, &predictor, &features)?);
    } else if let Some(ref path) = args.input {
        let features = load_profile_json(path)?;
        single = Some(run_prediction_mode(&args, &config, &predictor, &features)?);
    }

    if let Some(ref path) = args.batch {
        run_batch_mode(&args, &predictor, path)?;
    }

    if let Some(ref dir) = args.plot {
        let written = viz::generate_visualization_report(&artifact, single.as_ref(), dir)?;
        println!("\n=== Charts ===");
        for path in &written {
            println!("Saved: {}", path.display());
        }
    }

    Ok(())
}

fn run_report_mode(artifact: &ModelArtifact) {
    print_model_report(&ModelReport::from_artifact(artifact));
}

/// Score a single customer and print the result
fn run_prediction_mode(
    args: &Args,
    config: &ResolvedConfig,
    predictor: &ChurnPredictor,
    features: &FeatureVector,
) -> Result<PredictionRecord> {
    let start_time = Instant::now();
    let record = predictor.predict(features)?;
    log::debug!("Prediction took {:.3}ms", start_time.elapsed().as_secs_f64() * 1000.0);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_prediction(&record, args.top.unwrap_or(config.top_recommendations));
    }

    Ok(record)
}

/// Score every customer in a CSV file
fn run_batch_mode(args: &Args, predictor: &ChurnPredictor, path: &Path) -> Result<()> {
    let start_time = Instant::now();
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("batch path is not valid UTF-8: {}", path.display()))?;
    let batch = load_customer_batch(path_str, predictor.artifact().feature_names())?;

    if !args.json {
        println!("\n=== Batch Scoring ===");
        println!("Customers: {}", batch.len());
    }

    let mut distribution: BTreeMap<RiskTier, usize> = BTreeMap::new();
    let mut failed = 0;

    let results = predictor.predict_batch(&batch.rows);
    for (id, result) in batch.customer_ids.iter().zip(results) {
        match result {
            Ok(record) => {
                *distribution.entry(record.tier()).or_default() += 1;
                if args.json {
                    let line = serde_json::json!({ "customer_id": id, "prediction": record });
                    println!("{}", line);
                } else {
                    println!(
                        "{:<12} {:>7.2}%  {:<8}  {}",
                        id,
                        record.churn_probability() * 100.0,
                        record.tier().label(),
                        record.recommendations().first().map(String::as_str).unwrap_or("-")
                    );
                }
            }
            Err(err) => {
                failed += 1;
                log::error!("Customer {}: {}", id, err);
            }
        }
    }

    if !args.json {
        let scored = batch.len() - failed;
        println!("\n=== Risk Distribution ===");
        for tier in RiskTier::ALL.iter().rev() {
            let count = distribution.get(tier).copied().unwrap_or(0);
            let percentage = if scored > 0 {
                count as f64 / scored as f64 * 100.0
            } else {
                0.0
            };
            println!("{:<8}: {} customers ({:.1}%)", tier.label(), count, percentage);
        }
        if failed > 0 {
            println!("Failed: {} customers (see log)", failed);
        }
        println!("Processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}
