//! Configuration for the scoring pipeline
//!
//! All thresholds, severities and training hyper-parameters live here as
//! tunable defaults. None of the anomaly thresholds are validated statistics;
//! they were chosen for a 1–4 Likert scale.
//!
//! # Configuration File Format
//!
//! TOML format, every key optional:
//!
//! ```toml
//! [sentiment]
//! max_features = 1000
//! min_df = 2
//! max_df = 0.8
//! test_fraction = 0.2
//! seed = 42
//!
//! [anomaly]
//! scale_min = 1
//! scale_max = 4
//! low_std_threshold = 0.3
//! alternation_threshold = 0.8
//! category_variance_threshold = 2.0
//!
//! [anomaly.severity]
//! straight_lining = 1.0
//! extreme = 0.95
//!
//! [batch]
//! eps = 0.5
//! min_samples = 5
//! ```
//!
//! Environment variables override file values using a double-underscore
//! separator, e.g. `EVALSENSE__BATCH__EPS=0.75`.

use crate::error::{EvalSenseError, Result};
use crate::types::RatingScale;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "EVALSENSE";

/// Complete configuration for the scoring pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub sentiment: SentimentConfig,

    #[serde(default)]
    pub anomaly: AnomalyConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

/// Vectorizer and classifier training settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Vocabulary cap
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Minimum number of documents a term must appear in
    #[serde(default = "default_min_df")]
    pub min_df: usize,

    /// Maximum fraction of documents a term may appear in
    #[serde(default = "default_max_df")]
    pub max_df: f64,

    /// Longest n-gram (1 = unigrams only, 2 = unigrams + bigrams)
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    /// Held-out fraction for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed for the split and calibration folds
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// SVM soft-margin penalty
    #[serde(default = "default_c")]
    pub c: f64,

    /// RBF width; `None` selects 1 / (n_features * Var(X))
    #[serde(default)]
    pub gamma: Option<f64>,

    /// SMO stopping tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// SMO iteration cap per binary problem
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Cross-validation folds used to fit the probability sigmoid
    #[serde(default = "default_calibration_folds")]
    pub calibration_folds: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            min_df: default_min_df(),
            max_df: default_max_df(),
            ngram_max: default_ngram_max(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            c: default_c(),
            gamma: None,
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            calibration_folds: default_calibration_folds(),
        }
    }
}

/// Rule-based detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    #[serde(default = "default_scale_min")]
    pub scale_min: u8,

    #[serde(default = "default_scale_max")]
    pub scale_max: u8,

    /// Standard deviation below which ratings count as near-uniform
    #[serde(default = "default_low_std_threshold")]
    pub low_std_threshold: f64,

    /// Fraction of differing adjacent pairs above which ratings count as alternating
    #[serde(default = "default_alternation_threshold")]
    pub alternation_threshold: f64,

    /// Variance across category means above which ratings count as inconsistent
    #[serde(default = "default_category_variance_threshold")]
    pub category_variance_threshold: f64,

    #[serde(default)]
    pub severity: SeverityConfig,
}

impl AnomalyConfig {
    pub fn scale(&self) -> RatingScale {
        RatingScale {
            min: self.scale_min,
            max: self.scale_max,
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            scale_min: default_scale_min(),
            scale_max: default_scale_max(),
            low_std_threshold: default_low_std_threshold(),
            alternation_threshold: default_alternation_threshold(),
            category_variance_threshold: default_category_variance_threshold(),
            severity: SeverityConfig::default(),
        }
    }
}

/// Score attached to each rule when it fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub straight_lining: f64,
    pub extreme: f64,
    pub low_variance: f64,
    pub alternating: f64,
    pub category_inconsistency: f64,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            straight_lining: 1.0,
            extreme: 0.95,
            low_variance: 0.8,
            alternating: 0.85,
            category_inconsistency: 0.75,
        }
    }
}

/// Density-based batch clustering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Neighborhood radius in standardized feature space
    #[serde(default = "default_eps")]
    pub eps: f64,

    /// Neighbors (including the point itself) needed to be a core point
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            min_samples: default_min_samples(),
        }
    }
}

/// Where model artifacts live by default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
        }
    }
}

impl PathsConfig {
    pub fn sentiment_model(&self) -> PathBuf {
        self.model_dir.join("sentiment.evs")
    }

    pub fn anomaly_model(&self) -> PathBuf {
        self.model_dir.join("anomaly.evs")
    }
}

// Default value helpers
fn default_max_features() -> usize {
    1000
}

fn default_min_df() -> usize {
    2
}

fn default_max_df() -> f64 {
    0.8
}

fn default_ngram_max() -> usize {
    2
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_c() -> f64 {
    1.0
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_max_iterations() -> usize {
    100_000
}

fn default_calibration_folds() -> usize {
    5
}

fn default_scale_min() -> u8 {
    1
}

fn default_scale_max() -> u8 {
    4
}

fn default_low_std_threshold() -> f64 {
    0.3
}

fn default_alternation_threshold() -> f64 {
    0.8
}

fn default_category_variance_threshold() -> f64 {
    2.0
}

fn default_eps() -> f64 {
    0.5
}

fn default_min_samples() -> usize {
    5
}

fn default_model_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evalsense")
        .join("models")
}

impl ScoringConfig {
    /// Load configuration from an optional TOML file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                tracing::info!("Loading configuration from {:?}", path);
                builder = builder.add_source(config::File::from(path).required(true));
            } else {
                tracing::info!("Config file not found, using defaults: {:?}", path);
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ScoringConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EvalSenseError::Other(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject settings no component can work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EvalSenseError::Config(config::ConfigError::Message(msg)));

        let s = &self.sentiment;
        if !(s.test_fraction > 0.0 && s.test_fraction < 1.0) {
            return invalid(format!("sentiment.test_fraction must be in (0, 1), got {}", s.test_fraction));
        }
        if !(s.max_df > 0.0 && s.max_df <= 1.0) {
            return invalid(format!("sentiment.max_df must be in (0, 1], got {}", s.max_df));
        }
        if s.max_features == 0 || s.ngram_max == 0 {
            return invalid("sentiment.max_features and sentiment.ngram_max must be positive".to_string());
        }
        if s.c <= 0.0 || s.gamma.is_some_and(|g| g <= 0.0) {
            return invalid("sentiment.c and sentiment.gamma must be positive".to_string());
        }

        let a = &self.anomaly;
        if a.scale_min >= a.scale_max {
            return invalid(format!(
                "anomaly.scale_min ({}) must be below anomaly.scale_max ({})",
                a.scale_min, a.scale_max
            ));
        }
        let thresholds = [
            ("low_std_threshold", a.low_std_threshold),
            ("alternation_threshold", a.alternation_threshold),
            ("category_variance_threshold", a.category_variance_threshold),
        ];
        if let Some((name, value)) = thresholds.iter().find(|(_, v)| !(0.0..).contains(v)) {
            return invalid(format!("anomaly.{} must be non-negative, got {}", name, value));
        }
        let sev = &a.severity;
        let severities = [
            ("straight_lining", sev.straight_lining),
            ("extreme", sev.extreme),
            ("low_variance", sev.low_variance),
            ("alternating", sev.alternating),
            ("category_inconsistency", sev.category_inconsistency),
        ];
        if let Some((name, value)) = severities.iter().find(|(_, v)| !(0.0..=1.0).contains(v)) {
            return invalid(format!("anomaly.severity.{} must be in [0, 1], got {}", name, value));
        }

        let b = &self.batch;
        if b.eps <= 0.0 || b.min_samples == 0 {
            return invalid(format!(
                "batch.eps must be positive and batch.min_samples non-zero, got {} / {}",
                b.eps, b.min_samples
            ));
        }

        Ok(())
    }
}
