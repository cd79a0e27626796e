//! Pipeline configuration.
//!
//! Configuration is read from environment variables (`KWRANK_*`, see
//! [`crate::defaults`]). Unset variables take their default; unparsable values
//! fall back to the default with a warning.
//!
//! # Example
//!
//! ```rust
//! use kwrank_core::PipelineConfig;
//!
//! let config = PipelineConfig::from_env();
//! config.validate().expect("invalid configuration");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{Competition, ScoreWeights};

/// Where the planner validator takes market metrics from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorMode {
    /// Synthesized metrics; always available.
    #[default]
    Mock,
    /// Metrics from an injected provider.
    Api,
}

impl FromStr for ValidatorMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "api" => Ok(Self::Api),
            _ => Err(Error::Config(format!("Invalid validator mode: {}", s))),
        }
    }
}

impl fmt::Display for ValidatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Api => write!(f, "api"),
        }
    }
}

/// Settings shared by the pipeline stages and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub model_path: PathBuf,
    pub mode: ValidatorMode,
    pub min_volume: u64,
    pub min_score: f64,
    pub competition_allowed: Vec<Competition>,
    pub excluded_terms: Vec<String>,
    pub relevance_threshold: f64,
    pub weights: ScoreWeights,
    pub embedding_dim: usize,
    pub patterns_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::MODEL_PATH),
            mode: ValidatorMode::default(),
            min_volume: defaults::MIN_VOLUME,
            min_score: defaults::MIN_SCORE,
            competition_allowed: defaults::COMPETITION_ALLOWED.to_vec(),
            excluded_terms: Vec::new(),
            relevance_threshold: defaults::RELEVANCE_THRESHOLD,
            weights: ScoreWeights::default(),
            embedding_dim: defaults::EMBEDDING_DIM,
            patterns_path: PathBuf::from(defaults::PATTERNS_PATH),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(defaults::ENV_MODEL_PATH) {
            config.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(defaults::ENV_PATTERNS_PATH) {
            config.patterns_path = PathBuf::from(path);
        }

        config.mode = parse_or(&lookup, defaults::ENV_VALIDATOR_MODE, config.mode);
        config.min_volume = parse_or(&lookup, defaults::ENV_MIN_VOLUME, config.min_volume);
        config.min_score = parse_or(&lookup, defaults::ENV_MIN_SCORE, config.min_score);
        config.relevance_threshold = parse_or(
            &lookup,
            defaults::ENV_RELEVANCE_THRESHOLD,
            config.relevance_threshold,
        );
        config.weights.volume =
            parse_or(&lookup, defaults::ENV_WEIGHT_VOLUME, config.weights.volume);
        config.weights.cpc = parse_or(&lookup, defaults::ENV_WEIGHT_CPC, config.weights.cpc);
        config.embedding_dim =
            parse_or(&lookup, defaults::ENV_EMBEDDING_DIM, config.embedding_dim);

        if let Some(raw) = lookup(defaults::ENV_COMPETITION_ALLOWED) {
            match Competition::parse_list(&raw) {
                Ok(list) => config.competition_allowed = list,
                Err(e) => warn!(
                    var = defaults::ENV_COMPETITION_ALLOWED,
                    error = %e,
                    "Ignoring unparsable value, using default"
                ),
            }
        }
        if let Some(raw) = lookup(defaults::ENV_EXCLUDED_TERMS) {
            config.excluded_terms = split_list(&raw);
        }

        debug!(?config, "Pipeline configuration loaded");
        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(Error::Config(format!(
                "relevance_threshold must be within [0, 1], got: {}",
                self.relevance_threshold
            )));
        }

        if self.weights.volume < 0.0 || self.weights.cpc < 0.0 {
            return Err(Error::Config(format!(
                "score weights must be non-negative, got volume={} cpc={}",
                self.weights.volume, self.weights.cpc
            )));
        }

        if self.embedding_dim < defaults::MIN_EMBEDDING_DIM {
            return Err(Error::Config(format!(
                "embedding_dim must be at least {}, got: {}",
                defaults::MIN_EMBEDDING_DIM,
                self.embedding_dim
            )));
        }

        if self.min_score.is_nan() {
            return Err(Error::Config("min_score cannot be NaN".to_string()));
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, fallback: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => fallback,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!(var = key, value = %raw, error = %e, "Ignoring unparsable value, using default");
                fallback
            }
        },
    }
}

/// Split a comma-separated list, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
