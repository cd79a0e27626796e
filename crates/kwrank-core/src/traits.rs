//! Core traits for kwrank collaborators.
//!
//! These traits define the narrow interfaces the pipeline consumes, enabling
//! pluggable backends and test doubles. The pipeline is synchronous, so every
//! trait is a plain blocking interface.

use std::collections::BTreeSet;

use crate::defaults;
use crate::error::Result;
use crate::models::{Entity, MarketMetrics, Prediction};

// =============================================================================
// NLP CAPABILITY
// =============================================================================

/// Named-entity recognition and semantic embedding.
pub trait NlpBackend: Send + Sync {
    /// Recognize named entities in `text`.
    fn entities(&self, text: &str) -> Result<Vec<Entity>>;

    /// Embed `text` into a semantic vector. Width is backend-specific; callers
    /// truncate or pad to their own width.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Tags for `text`: entity texts of at least three characters,
    /// lowercased, deduplicated and sorted.
    fn tags(&self, text: &str) -> Result<Vec<String>> {
        let tags: BTreeSet<String> = self
            .entities(text)?
            .into_iter()
            .map(|e| e.text.trim().to_lowercase())
            .filter(|t| t.chars().count() >= defaults::MIN_TAG_CHARS)
            .collect();
        Ok(tags.into_iter().collect())
    }
}

// =============================================================================
// MARKET METRICS
// =============================================================================

/// Source of market metrics for a keyword.
pub trait MetricsProvider: Send + Sync {
    fn fetch(&self, term: &str) -> Result<MarketMetrics>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

// =============================================================================
// CLASSIFIER
// =============================================================================

/// A trained binary classifier.
pub trait ProbabilisticClassifier: Send + Sync {
    /// Class probabilities `[p_negative, p_positive]` for each input row.
    fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<[f64; 2]>>;

    /// Number of input columns the classifier was trained on.
    fn n_features(&self) -> usize;

    /// Categorical code for an origin label (`0` when unknown).
    fn origin_code(&self, _origin: &str) -> f32 {
        0.0
    }
}

/// Semantic relevance gate applied to each filtered keyword.
///
/// Implementations must not panic on bad input; every failure is reported as
/// `Prediction::Unscorable`.
pub trait RelevanceGate: Send + Sync {
    fn predict(
        &self,
        text: &str,
        theme: &str,
        origin: &str,
        tags: &[String],
        threshold: f64,
    ) -> Prediction;
}
