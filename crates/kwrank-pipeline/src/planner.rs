//! Planner validator: attaches market metrics, scores and tiers a batch.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use kwrank_core::{
    new_trace_id, Error, MetricsProvider, PipelineConfig, Result, ScoreWeights, ScoredKeyword,
    Tier, ValidatorMode,
};

use crate::metrics::SimulatedMetrics;
use crate::score::score;

/// Validates raw candidates against a market-metrics source.
pub struct PlannerValidator {
    mode: ValidatorMode,
    weights: ScoreWeights,
    provider: Option<Arc<dyn MetricsProvider>>,
}

impl PlannerValidator {
    /// Validator for `mode`. Mock mode uses [`SimulatedMetrics`]; api mode
    /// needs a provider from [`with_provider`](Self::with_provider).
    pub fn new(mode: ValidatorMode) -> Self {
        let provider: Option<Arc<dyn MetricsProvider>> = match mode {
            ValidatorMode::Mock => Some(Arc::new(SimulatedMetrics::new())),
            ValidatorMode::Api => None,
        };
        Self {
            mode,
            weights: ScoreWeights::default(),
            provider,
        }
    }

    pub fn mock() -> Self {
        Self::new(ValidatorMode::Mock)
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.mode).with_weights(config.weights)
    }

    /// Replace the metrics source (a seeded simulation in tests, or the
    /// provider backing api mode).
    pub fn with_provider(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn mode(&self) -> ValidatorMode {
        self.mode
    }

    /// Attach metrics, score, sort descending and tier a batch.
    ///
    /// Fails only on structurally invalid input (empty list, blank entry) or
    /// a missing provider. A candidate whose metrics or score cannot be
    /// computed is logged and dropped.
    pub fn validate<S: AsRef<str>>(
        &self,
        candidates: &[S],
        trace_id: Option<&str>,
    ) -> Result<Vec<ScoredKeyword>> {
        if candidates.is_empty() {
            return Err(Error::InvalidInput("candidate list is empty".to_string()));
        }
        if let Some(pos) = candidates.iter().position(|c| c.as_ref().trim().is_empty()) {
            return Err(Error::InvalidInput(format!(
                "candidate at position {} is blank",
                pos
            )));
        }
        let provider = self.provider.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "validator mode '{}' requires a metrics provider",
                self.mode
            ))
        })?;

        let trace_id = trace_id.map(str::to_string).unwrap_or_else(new_trace_id);
        let start = Instant::now();

        let mut scored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let keyword = candidate.as_ref();

            let metrics = match provider.fetch(keyword) {
                Ok(m) => m,
                Err(e) => {
                    warn!(
                        trace_id = %trace_id,
                        candidate = %keyword,
                        provider = provider.name(),
                        error = %e,
                        "Metrics fetch failed, dropping candidate"
                    );
                    continue;
                }
            };

            let keyword_score = i64::try_from(metrics.volume)
                .map_err(|_| Error::InvalidInput(format!("volume {} out of range", metrics.volume)))
                .and_then(|volume| score(volume, metrics.cpc, &self.weights));
            let keyword_score = match keyword_score {
                Ok(s) => s,
                Err(e) => {
                    warn!(
                        trace_id = %trace_id,
                        candidate = %keyword,
                        error = %e,
                        "Scoring failed, dropping candidate"
                    );
                    continue;
                }
            };

            trace!(
                trace_id = %trace_id,
                candidate = %keyword,
                volume = metrics.volume,
                cpc = metrics.cpc,
                competition = %metrics.competition,
                score = keyword_score,
                "Candidate scored"
            );

            scored.push(ScoredKeyword {
                keyword: keyword.to_string(),
                metrics,
                score: keyword_score,
                trace_id: trace_id.clone(),
                tier: Tier::Support,
            });
        }

        // Stable: equal scores keep input order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        assign_tiers(&mut scored);

        debug!(
            trace_id = %trace_id,
            component = "planner",
            mode = %self.mode,
            input_count = candidates.len(),
            output_count = scored.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Validation complete"
        );
        if scored.len() < candidates.len() {
            info!(
                trace_id = %trace_id,
                dropped = candidates.len() - scored.len(),
                "Some candidates were dropped during validation"
            );
        }

        Ok(scored)
    }
}

/// Assign tiers by position in a batch already sorted by descending score.
pub fn assign_tiers(items: &mut [ScoredKeyword]) {
    for (rank, item) in items.iter_mut().enumerate() {
        item.tier = Tier::for_rank(rank);
    }
}
