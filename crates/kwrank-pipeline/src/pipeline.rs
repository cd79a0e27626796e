//! Pipeline orchestrator: VALIDATE → FILTER → CLASSIFY → DONE.
//!
//! Each stage consumes the previous stage's output. Only structurally invalid
//! input (or a validator without a metrics source) is fatal; every per-item
//! failure in the classify stage is caught, logged with the trace id and turned
//! into a rejection.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use kwrank_core::{
    defaults, new_trace_id, Competition, Error, MetricsProvider, NlpBackend, PipelineConfig,
    PipelineRun, Prediction, RejectReason, RejectedKeyword, RelevanceGate, Result, RunMetrics,
    ScoreWeights, ScoredKeyword, ValidatorMode,
};
use kwrank_inference::{LocalNlpBackend, RelevancePredictor};

use crate::filter::{FilterCriteria, KeywordFilter};
use crate::metrics::SimulatedMetrics;
use crate::planner::PlannerValidator;

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validate,
    Filter,
    Classify,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validate => write!(f, "VALIDATE"),
            Self::Filter => write!(f, "FILTER"),
            Self::Classify => write!(f, "CLASSIFY"),
            Self::Done => write!(f, "DONE"),
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub mode: ValidatorMode,
    pub min_volume: u64,
    pub min_score: f64,
    pub excluded_terms: Vec<String>,
    pub competition_allowed: Vec<Competition>,
    /// Recorded on the run so callers skip persistence; results are unchanged.
    pub dry_run: bool,
    /// Generated when absent.
    pub trace_id: Option<String>,
    /// Theme candidates are judged against.
    pub theme: String,
    /// Origin label fed to the classifier.
    pub origin: String,
    pub threshold: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let criteria = FilterCriteria::default();
        Self {
            mode: ValidatorMode::default(),
            min_volume: criteria.min_volume,
            min_score: criteria.min_score,
            excluded_terms: criteria.excluded_terms,
            competition_allowed: criteria.competition_allowed,
            dry_run: false,
            trace_id: None,
            theme: String::new(),
            origin: defaults::ORIGIN.to_string(),
            threshold: defaults::RELEVANCE_THRESHOLD,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            mode: config.mode,
            min_volume: config.min_volume,
            min_score: config.min_score,
            excluded_terms: config.excluded_terms.clone(),
            competition_allowed: config.competition_allowed.clone(),
            threshold: config.relevance_threshold,
            ..Self::default()
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            competition_allowed: self.competition_allowed.clone(),
            excluded_terms: self.excluded_terms.clone(),
            min_volume: self.min_volume,
            min_score: self.min_score,
        }
    }
}

/// Runs candidates through validation, filtering and the relevance gate.
pub struct PipelineOrchestrator {
    nlp: Arc<dyn NlpBackend>,
    gate: Arc<dyn RelevanceGate>,
    weights: ScoreWeights,
    simulated: Arc<dyn MetricsProvider>,
    provider: Option<Arc<dyn MetricsProvider>>,
}

impl PipelineOrchestrator {
    /// Orchestrator with an NLP capability (for tags) and a relevance gate.
    pub fn new(nlp: Arc<dyn NlpBackend>, gate: Arc<dyn RelevanceGate>) -> Self {
        Self {
            nlp,
            gate,
            weights: ScoreWeights::default(),
            simulated: Arc::new(SimulatedMetrics::new()),
            provider: None,
        }
    }

    /// Orchestrator with the local NLP backend and the configured classifier.
    ///
    /// The classifier is shared process-wide per model path, so it is loaded
    /// once and a missing artifact is reported once.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let nlp: Arc<dyn NlpBackend> =
            Arc::new(LocalNlpBackend::new().with_dimension(config.embedding_dim));
        let predictor = shared_predictor(nlp.clone(), config);
        Self::new(nlp, predictor).with_weights(config.weights)
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Metrics provider used in api mode.
    pub fn with_metrics_provider(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the simulated source used in mock mode.
    pub fn with_simulated_metrics(mut self, simulated: Arc<dyn MetricsProvider>) -> Self {
        self.simulated = simulated;
        self
    }

    fn validator(&self, mode: ValidatorMode) -> PlannerValidator {
        let validator = PlannerValidator::new(mode).with_weights(self.weights);
        match mode {
            ValidatorMode::Mock => validator.with_provider(self.simulated.clone()),
            ValidatorMode::Api => match &self.provider {
                Some(provider) => validator.with_provider(provider.clone()),
                None => validator,
            },
        }
    }

    /// Run one batch.
    pub fn run<S: AsRef<str>>(
        &self,
        candidates: &[S],
        options: &PipelineOptions,
    ) -> Result<PipelineRun> {
        if !(0.0..=1.0).contains(&options.threshold) {
            return Err(Error::InvalidInput(format!(
                "threshold must be within [0, 1], got {}",
                options.threshold
            )));
        }
        if options.min_score.is_nan() {
            return Err(Error::InvalidInput("min_score must be a number".to_string()));
        }

        let trace_id = options.trace_id.clone().unwrap_or_else(new_trace_id);
        let start = Instant::now();

        info!(
            trace_id = %trace_id,
            component = "pipeline",
            input_count = candidates.len(),
            mode = %options.mode,
            dry_run = options.dry_run,
            "Pipeline run started"
        );

        log_stage(&trace_id, PipelineStage::Validate);
        let validated = self
            .validator(options.mode)
            .validate(candidates, Some(&trace_id))?;

        log_stage(&trace_id, PipelineStage::Filter);
        let filtered = KeywordFilter::new(options.criteria()).filter(&validated);

        log_stage(&trace_id, PipelineStage::Classify);
        let mut approved = Vec::new();
        let mut rejected = Vec::new();
        let mut unscorable = 0;

        for item in &filtered {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.classify(item, options)));

            let reason = match outcome {
                Ok(Ok(Prediction::Scored {
                    relevant: true,
                    probability,
                })) => {
                    debug!(trace_id = %trace_id, candidate = %item.keyword, probability, "Approved");
                    approved.push(item.clone());
                    continue;
                }
                Ok(Ok(Prediction::Scored { probability, .. })) => {
                    debug!(trace_id = %trace_id, candidate = %item.keyword, probability, "Not relevant");
                    RejectReason::NotRelevant { probability }
                }
                Ok(Ok(Prediction::Unscorable { reason })) => {
                    unscorable += 1;
                    RejectReason::Unscorable { detail: reason }
                }
                Ok(Err(e)) => {
                    warn!(
                        trace_id = %trace_id,
                        candidate = %item.keyword,
                        error = %e,
                        "Classification failed"
                    );
                    unscorable += 1;
                    RejectReason::ClassificationFailed {
                        detail: e.to_string(),
                    }
                }
                Err(payload) => {
                    let detail = panic_message(payload.as_ref());
                    warn!(
                        trace_id = %trace_id,
                        candidate = %item.keyword,
                        error = %detail,
                        "Relevance gate panicked"
                    );
                    unscorable += 1;
                    RejectReason::ClassificationFailed { detail }
                }
            };

            rejected.push(RejectedKeyword {
                keyword: item.keyword.clone(),
                reason,
            });
        }

        log_stage(&trace_id, PipelineStage::Done);
        let metrics = RunMetrics {
            total: candidates.len(),
            validated: validated.len(),
            filtered: filtered.len(),
            approved: approved.len(),
            rejected: rejected.len(),
            unscorable,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            trace_id = %trace_id,
            component = "pipeline",
            total = metrics.total,
            validated = metrics.validated,
            filtered = metrics.filtered,
            approved = metrics.approved,
            rejected = metrics.rejected,
            unscorable = metrics.unscorable,
            duration_ms = metrics.duration_ms,
            dry_run = options.dry_run,
            "Pipeline run finished"
        );

        Ok(PipelineRun {
            trace_id,
            candidates: candidates
                .iter()
                .map(|c| c.as_ref().to_string())
                .collect(),
            approved,
            rejected,
            metrics,
            dry_run: options.dry_run,
        })
    }

    fn classify(&self, item: &ScoredKeyword, options: &PipelineOptions) -> Result<Prediction> {
        let tags = self.nlp.tags(&item.keyword)?;
        Ok(self.gate.predict(
            &item.keyword,
            &options.theme,
            &options.origin,
            &tags,
            options.threshold,
        ))
    }
}

fn log_stage(trace_id: &str, stage: PipelineStage) {
    debug!(trace_id = %trace_id, component = "pipeline", stage = %stage, "Stage entered");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("relevance gate panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("relevance gate panicked: {}", s)
    } else {
        "relevance gate panicked".to_string()
    }
}

/// Predictors shared by `run_pipeline`, keyed by model path and embedding width.
static PREDICTORS: Lazy<Mutex<HashMap<(PathBuf, usize), Arc<RelevancePredictor>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn shared_predictor(nlp: Arc<dyn NlpBackend>, config: &PipelineConfig) -> Arc<RelevancePredictor> {
    let mut predictors = PREDICTORS.lock().unwrap_or_else(PoisonError::into_inner);
    predictors
        .entry((config.model_path.clone(), config.embedding_dim))
        .or_insert_with(|| {
            debug!(
                model_path = %config.model_path.display(),
                embedding_dim = config.embedding_dim,
                "Creating shared relevance predictor"
            );
            Arc::new(RelevancePredictor::from_config(nlp, config))
        })
        .clone()
}

/// Run a batch with the local NLP backend and the configured classifier.
///
/// Later calls with the same model path reuse the classifier loaded by the
/// first one.
pub fn run_pipeline<S: AsRef<str>>(
    candidates: &[S],
    config: &PipelineConfig,
    options: &PipelineOptions,
) -> Result<PipelineRun> {
    PipelineOrchestrator::from_config(config).run(candidates, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwrank_core::MarketMetrics;
    use kwrank_inference::mock::MockNlpBackend;

    /// Gate answering from the keyword text.
    struct ScriptedGate;

    impl RelevanceGate for ScriptedGate {
        fn predict(&self, text: &str, _: &str, _: &str, _: &[String], threshold: f64) -> Prediction {
            if text.contains("panic") {
                panic!("scripted failure");
            }
            if text.contains("unscorable") {
                return Prediction::unscorable("model unavailable");
            }
            let p = if text.contains("good") { 0.9 } else { 0.1 };
            Prediction::scored(p, threshold)
        }
    }

    /// Provider giving every term the same passing metrics.
    struct FlatProvider;

    impl MetricsProvider for FlatProvider {
        fn fetch(&self, _term: &str) -> Result<MarketMetrics> {
            Ok(MarketMetrics {
                volume: 5000,
                cpc: 2.0,
                competition: Competition::Low,
            })
        }

        fn name(&self) -> &str {
            "flat"
        }
    }

    fn orchestrator() -> PipelineOrchestrator {
        PipelineOrchestrator::new(Arc::new(MockNlpBackend::new()), Arc::new(ScriptedGate))
            .with_simulated_metrics(Arc::new(FlatProvider))
    }

    #[test]
    fn test_outcomes_are_partitioned() {
        let run = orchestrator()
            .run(
                &["good seo", "bad seo", "unscorable seo", "panic seo"],
                &PipelineOptions::default(),
            )
            .unwrap();

        assert_eq!(run.metrics.total, 4);
        assert_eq!(run.metrics.filtered, 4);
        assert_eq!(run.metrics.approved, 1);
        assert_eq!(run.metrics.rejected, 3);
        assert_eq!(run.metrics.unscorable, 2);
        assert_eq!(run.approved[0].keyword, "good seo");

        let reasons: Vec<(&str, &RejectReason)> = run
            .rejected
            .iter()
            .map(|r| (r.keyword.as_str(), &r.reason))
            .collect();
        assert!(matches!(reasons[0], ("bad seo", RejectReason::NotRelevant { .. })));
        assert!(matches!(reasons[1], ("unscorable seo", RejectReason::Unscorable { .. })));
        assert!(matches!(
            reasons[2],
            ("panic seo", RejectReason::ClassificationFailed { .. })
        ));
    }

    #[test]
    fn test_tag_failure_rejects_item() {
        let nlp = MockNlpBackend::new().fail_on("good broken");
        let orchestrator = PipelineOrchestrator::new(Arc::new(nlp), Arc::new(ScriptedGate))
            .with_simulated_metrics(Arc::new(FlatProvider));

        let run = orchestrator
            .run(&["good one", "good broken"], &PipelineOptions::default())
            .unwrap();
        assert_eq!(run.metrics.approved, 1);
        assert_eq!(run.rejected_keywords(), vec!["good broken"]);
    }

    #[test]
    fn test_tags_reach_gate() {
        struct TagCountGate;
        impl RelevanceGate for TagCountGate {
            fn predict(&self, _: &str, _: &str, _: &str, tags: &[String], t: f64) -> Prediction {
                Prediction::scored(if tags.is_empty() { 0.0 } else { 1.0 }, t)
            }
        }

        let nlp = MockNlpBackend::new().with_entity("instagram", "org");
        let run = PipelineOrchestrator::new(Arc::new(nlp), Arc::new(TagCountGate))
            .with_simulated_metrics(Arc::new(FlatProvider))
            .run(&["ads no instagram", "ads no tiktok"], &PipelineOptions::default())
            .unwrap();

        assert_eq!(run.approved.len(), 1);
        assert_eq!(run.approved[0].keyword, "ads no instagram");
    }

    #[test]
    fn test_dry_run_is_recorded_only() {
        let options = PipelineOptions {
            dry_run: true,
            trace_id: Some("fixed".to_string()),
            ..PipelineOptions::default()
        };
        let dry = orchestrator().run(&["good a", "bad b"], &options).unwrap();
        let wet = orchestrator()
            .run(
                &["good a", "bad b"],
                &PipelineOptions {
                    dry_run: false,
                    ..options.clone()
                },
            )
            .unwrap();

        assert!(dry.dry_run);
        assert!(!wet.dry_run);
        assert_eq!(dry.approved, wet.approved);
        assert_eq!(dry.rejected, wet.rejected);
        assert_eq!(dry.trace_id, "fixed");
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            orchestrator().run(&empty, &PipelineOptions::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bad_threshold_is_fatal() {
        let options = PipelineOptions {
            threshold: 1.5,
            ..PipelineOptions::default()
        };
        assert!(orchestrator().run(&["good"], &options).is_err());
    }

    #[test]
    fn test_candidate_text_matches_outputs() {
        let run = orchestrator()
            .run(&["  good seo ", "bad seo"], &PipelineOptions::default())
            .unwrap();
        assert_eq!(run.candidates[0], "  good seo ");
        assert_eq!(run.approved[0].keyword, run.candidates[0]);
        assert_eq!(run.rejected[0].keyword, run.candidates[1]);
    }

    #[test]
    fn test_shared_predictor_per_model_path() {
        let config = PipelineConfig {
            model_path: PathBuf::from("/nonexistent/shared-predictor.json"),
            ..PipelineConfig::default()
        };
        let nlp: Arc<dyn NlpBackend> = Arc::new(MockNlpBackend::new());
        let first = shared_predictor(nlp.clone(), &config);
        let second = shared_predictor(nlp.clone(), &config);
        assert!(Arc::ptr_eq(&first, &second));

        let other = PipelineConfig {
            model_path: PathBuf::from("/nonexistent/other-predictor.json"),
            ..config
        };
        assert!(!Arc::ptr_eq(&first, &shared_predictor(nlp, &other)));
    }

    #[test]
    fn test_nan_min_score_is_fatal() {
        let options = PipelineOptions {
            min_score: f64::NAN,
            ..PipelineOptions::default()
        };
        assert!(matches!(
            orchestrator().run(&["good"], &options),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_api_mode_uses_provider() {
        let options = PipelineOptions {
            mode: ValidatorMode::Api,
            ..PipelineOptions::default()
        };
        assert!(matches!(
            orchestrator().run(&["good"], &options),
            Err(Error::Config(_))
        ));

        let run = orchestrator()
            .with_metrics_provider(Arc::new(FlatProvider))
            .run(&["good"], &options)
            .unwrap();
        assert_eq!(run.approved[0].metrics.volume, 5000);
    }

    #[test]
    fn test_options_from_config() {
        let config = PipelineConfig {
            min_volume: 10,
            relevance_threshold: 0.7,
            ..PipelineConfig::default()
        };
        let options = PipelineOptions::from_config(&config);
        assert_eq!(options.min_volume, 10);
        assert_eq!(options.threshold, 0.7);
        assert_eq!(options.origin, defaults::ORIGIN);
    }
}
