//! Configuration file support
//!
//! Search order:
//! 1. Explicit path (`--config` flag)
//! 2. `.churnwatchrc.json` in the working directory
//! 3. `churnwatch.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::predictor::MissingFeaturePolicy;
use crate::recommend::{Guard, RecommendationEngine, RecommendationRule};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of recommendations shown before the "more available" hint
pub const DEFAULT_TOP_RECOMMENDATIONS: usize = 3;

const CONFIG_FILE_NAMES: [&str; 2] = [".churnwatchrc.json", "churnwatch.config.json"];

/// Churnwatch configuration loaded from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChurnConfig {
    /// Path to the model artifact (default: search the standard locations)
    #[serde(default)]
    pub artifact: Option<PathBuf>,

    /// Handling of features missing from a request (default: warn)
    #[serde(default)]
    pub missing_features: Option<MissingFeaturePolicy>,

    /// Recommendations displayed per prediction (default: 3)
    #[serde(default)]
    pub top_recommendations: Option<usize>,

    /// Rules evaluated after the built-in table
    #[serde(default)]
    pub extra_rules: Vec<RecommendationRule>,
}

/// Configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub artifact: Option<PathBuf>,
    pub missing_features: MissingFeaturePolicy,
    pub top_recommendations: usize,
    pub engine: RecommendationEngine,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl ChurnConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(top) = self.top_recommendations {
            if top == 0 {
                anyhow::bail!("top_recommendations must be at least 1");
            }
        }

        for (i, rule) in self.extra_rules.iter().enumerate() {
            if rule.message.trim().is_empty() {
                anyhow::bail!("extra_rules[{}].message must not be empty", i);
            }
            match &rule.guard {
                Guard::FeatureAbove { feature, threshold }
                | Guard::FeatureBelow { feature, threshold } => {
                    if feature.trim().is_empty() {
                        anyhow::bail!("extra_rules[{}].guard.feature must not be empty", i);
                    }
                    if !threshold.is_finite() {
                        anyhow::bail!(
                            "extra_rules[{}].guard.threshold must be finite (got {})",
                            i,
                            threshold
                        );
                    }
                }
                Guard::Tier { .. } | Guard::TierAtLeast { .. } => {}
            }
        }

        Ok(())
    }

    /// Resolve config into the form the CLI consumes
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        Ok(ResolvedConfig {
            artifact: self.artifact.clone(),
            missing_features: self.missing_features.unwrap_or_default(),
            top_recommendations: self
                .top_recommendations
                .unwrap_or(DEFAULT_TOP_RECOMMENDATIONS),
            engine: RecommendationEngine::with_extra_rules(self.extra_rules.iter().cloned()),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        ChurnConfig::default().resolve()
    }
}

/// Load a config file from an explicit path
pub fn load_config_file(path: &Path) -> Result<ChurnConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: ChurnConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Discover a config file in `base_dir`, returning `None` to use defaults
pub fn discover_config(base_dir: &Path) -> Result<Option<(ChurnConfig, PathBuf)>> {
    for name in CONFIG_FILE_NAMES {
        let path = base_dir.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load and resolve configuration: explicit path, then discovery, then defaults
pub fn load_and_resolve(base_dir: &Path, explicit_path: Option<&Path>) -> Result<ResolvedConfig> {
    let found = match explicit_path {
        Some(path) => Some((load_config_file(path)?, path.to_path_buf())),
        None => discover_config(base_dir)?,
    };

    match found {
        Some((config, path)) => {
            let mut resolved = config
                .resolve()
                .with_context(|| format!("invalid config in {}", path.display()))?;
            log::debug!("Using config file {}", path.display());
            resolved.config_path = Some(path);
            Ok(resolved)
        }
        None => ResolvedConfig::defaults(),
    }
}
