//! Configuration for the prediction pipeline.
//!
//! All values come from environment variables with sensible defaults and are
//! threaded into components by value; nothing reads configuration from
//! ambient scope after startup.

use anyhow::{Context, Result};
use std::env;

/// Feature engineering knobs.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Trailing window sizes for rolling mean/std columns.
    pub rolling_windows: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolling_windows: vec![3, 5],
        }
    }
}

impl FeatureConfig {
    pub fn from_env() -> Result<Self> {
        let rolling_windows = match env::var("ROLLING_WINDOWS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| {
                    s.trim()
                        .parse::<usize>()
                        .with_context(|| format!("invalid ROLLING_WINDOWS entry: {s}"))
                })
                .collect::<Result<Vec<_>>>()?,
            Err(_) => Self::default().rolling_windows,
        };
        if rolling_windows.is_empty() || rolling_windows.contains(&0) {
            anyhow::bail!("ROLLING_WINDOWS must be a non-empty list of positive integers");
        }
        Ok(Self { rolling_windows })
    }
}

/// Random forest hyperparameters and evaluation settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub cv_folds: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
            test_fraction: 0.2,
            cv_folds: 5,
        }
    }
}

impl ModelConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            n_trees: parse_env("MODEL_N_TREES", defaults.n_trees)?,
            max_depth: parse_env("MODEL_MAX_DEPTH", defaults.max_depth)?,
            min_samples_split: parse_env("MODEL_MIN_SAMPLES_SPLIT", defaults.min_samples_split)?,
            min_samples_leaf: parse_env("MODEL_MIN_SAMPLES_LEAF", defaults.min_samples_leaf)?,
            seed: parse_env("MODEL_SEED", defaults.seed)?,
            test_fraction: parse_env("MODEL_TEST_FRACTION", defaults.test_fraction)?,
            cv_folds: parse_env("MODEL_CV_FOLDS", defaults.cv_folds)?,
        };
        if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
            anyhow::bail!("MODEL_TEST_FRACTION must be in (0, 1)");
        }
        if config.cv_folds < 2 {
            anyhow::bail!("MODEL_CV_FOLDS must be at least 2");
        }
        Ok(config)
    }
}

/// Prediction service settings.
#[derive(Debug, Clone)]
pub struct PredictionConfig {
    /// How many globally important features to attach to each result.
    pub top_features: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self { top_features: 5 }
    }
}

impl PredictionConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            top_features: parse_env("PREDICTION_TOP_FEATURES", Self::default().top_features)?,
        })
    }
}

/// Aggregated application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub features: FeatureConfig,
    pub model: ModelConfig,
    pub prediction: PredictionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            features: FeatureConfig::from_env()?,
            model: ModelConfig::from_env()?,
            prediction: PredictionConfig::from_env()?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}
