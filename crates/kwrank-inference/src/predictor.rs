//! Fail-closed relevance predictor.
//!
//! Wraps a [`ProbabilisticClassifier`] and the [`FeatureExtractor`] that feeds
//! it. The classifier is loaded lazily on first use and cached for the life of
//! the predictor. A missing or broken artifact degrades every prediction to
//! [`Prediction::Unscorable`] instead of failing; the condition is logged once,
//! at load time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use kwrank_core::{PipelineConfig, Prediction, ProbabilisticClassifier, RelevanceGate};

use crate::features::{validate_features, FeatureExtractor};
use crate::model::RelevanceModel;

type SharedClassifier = Arc<dyn ProbabilisticClassifier>;

/// Relevance gate backed by a trained classifier.
pub struct RelevancePredictor {
    extractor: FeatureExtractor,
    model_path: Option<PathBuf>,
    classifier: OnceCell<Option<SharedClassifier>>,
}

impl std::fmt::Debug for RelevancePredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevancePredictor")
            .field("extractor", &self.extractor)
            .field("model_path", &self.model_path)
            .field("loaded", &self.classifier.get().is_some())
            .finish()
    }
}

impl RelevancePredictor {
    /// Predictor that loads its classifier from `model_path` on first use.
    pub fn new(extractor: FeatureExtractor, model_path: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            model_path: Some(model_path.into()),
            classifier: OnceCell::new(),
        }
    }

    /// Predictor around an already constructed classifier.
    pub fn with_classifier(extractor: FeatureExtractor, classifier: SharedClassifier) -> Self {
        Self {
            extractor,
            model_path: None,
            classifier: OnceCell::with_value(Some(classifier)),
        }
    }

    /// Predictor using the configured model path and embedding width.
    pub fn from_config(nlp: Arc<dyn kwrank_core::NlpBackend>, config: &PipelineConfig) -> Self {
        let extractor = FeatureExtractor::new(nlp).with_embedding_dim(config.embedding_dim);
        Self::new(extractor, config.model_path.clone())
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Whether a classifier is loaded (forces the lazy load).
    pub fn is_model_available(&self) -> bool {
        self.classifier().is_some()
    }

    fn classifier(&self) -> Option<&SharedClassifier> {
        self.classifier
            .get_or_init(|| self.model_path.as_deref().and_then(load_classifier))
            .as_ref()
    }

    /// Predict relevance of one candidate.
    ///
    /// Never fails: feature extraction errors, invalid features, an
    /// unavailable model and inference errors all yield
    /// [`Prediction::Unscorable`].
    pub fn predict(
        &self,
        text: &str,
        theme: &str,
        origin: &str,
        tags: &[String],
        threshold: f64,
    ) -> Prediction {
        let features = match self.extractor.extract(text, theme, origin, tags) {
            Ok(features) => features,
            Err(e) => {
                warn!(candidate = %text, error = %e, "Feature extraction failed");
                return Prediction::unscorable(format!("feature extraction failed: {}", e));
            }
        };

        if !validate_features(&features) {
            warn!(candidate = %text, theme = %theme, "Invalid features");
            return Prediction::unscorable("invalid features");
        }

        let Some(classifier) = self.classifier() else {
            return Prediction::unscorable("model unavailable");
        };

        let row = features.to_row(classifier.origin_code(&features.origin));
        if row.len() != classifier.n_features() {
            warn!(
                candidate = %text,
                columns = row.len(),
                expected = classifier.n_features(),
                "Feature width does not match the trained model"
            );
            return Prediction::unscorable("feature width mismatch");
        }

        let probability = match classifier.predict_proba(&[row]) {
            Ok(probs) => match probs.first() {
                Some(p) => p[1],
                None => return Prediction::unscorable("classifier returned no rows"),
            },
            Err(e) => {
                warn!(candidate = %text, error = %e, "Prediction failed");
                return Prediction::unscorable(format!("prediction failed: {}", e));
            }
        };

        let prediction = Prediction::scored(probability, threshold);
        debug!(
            candidate = %text,
            probability,
            relevant = prediction.is_relevant(),
            "Relevance predicted"
        );
        prediction
    }
}

impl RelevanceGate for RelevancePredictor {
    fn predict(
        &self,
        text: &str,
        theme: &str,
        origin: &str,
        tags: &[String],
        threshold: f64,
    ) -> Prediction {
        RelevancePredictor::predict(self, text, theme, origin, tags, threshold)
    }
}

fn load_classifier(path: &Path) -> Option<SharedClassifier> {
    if !path.exists() {
        warn!(
            model_path = %path.display(),
            "Relevance model not found; all candidates will be unscorable"
        );
        return None;
    }

    match RelevanceModel::load(path) {
        Ok(model) => {
            info!(
                model_path = %path.display(),
                features = model.feature_names.len(),
                "Relevance model loaded"
            );
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!(
                model_path = %path.display(),
                error = %e,
                "Failed to load relevance model; all candidates will be unscorable"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalNlpBackend;
    use crate::mock::MockNlpBackend;
    use crate::model::{ModelKind, ARTIFACT_VERSION};
    use kwrank_core::{defaults, Error, Result};

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(Arc::new(LocalNlpBackend::new()))
    }

    /// Logistic model driven only by `word_count`.
    fn word_count_model(weight: f64, intercept: f64) -> RelevanceModel {
        let names = RelevanceModel::feature_names_for(defaults::EMBEDDING_DIM);
        let mut coefficients = vec![0.0; names.len()];
        coefficients[0] = weight;
        RelevanceModel {
            version: ARTIFACT_VERSION.to_string(),
            trained_at: None,
            feature_names: names,
            origin_vocabulary: vec!["planner".to_string()],
            scaler: None,
            model: ModelKind::Logistic {
                coefficients,
                intercept,
            },
        }
    }

    struct FailingClassifier;

    impl ProbabilisticClassifier for FailingClassifier {
        fn predict_proba(&self, _rows: &[Vec<f32>]) -> Result<Vec<[f64; 2]>> {
            Err(Error::Model("boom".to_string()))
        }

        fn n_features(&self) -> usize {
            defaults::EMBEDDING_DIM + 8
        }
    }

    #[test]
    fn test_missing_model_is_unscorable() {
        let predictor = RelevancePredictor::new(extractor(), "/nonexistent/model.json");
        let prediction = predictor.predict("curso de seo", "seo", "planner", &[], 0.5);

        assert!(matches!(prediction, Prediction::Unscorable { .. }));
        assert_eq!(prediction.as_pair(), (false, 0.0));
        assert!(!predictor.is_model_available());
    }

    #[test]
    fn test_threshold_decides_relevance() {
        // 3 words * 1.0 - 3.0 = 0 -> p = 0.5
        let predictor =
            RelevancePredictor::with_classifier(extractor(), Arc::new(word_count_model(1.0, -3.0)));

        let p = predictor.predict("curso de seo", "", "planner", &[], 0.5);
        assert!(p.is_relevant());
        assert!((p.probability() - 0.5).abs() < 1e-9);

        let p = predictor.predict("curso de seo", "", "planner", &[], 0.6);
        assert!(!p.is_relevant());
        assert!(matches!(p, Prediction::Scored { .. }));
    }

    #[test]
    fn test_extraction_failure_is_unscorable() {
        let nlp = MockNlpBackend::new().fail_on("quebrado");
        let predictor = RelevancePredictor::with_classifier(
            FeatureExtractor::new(Arc::new(nlp)),
            Arc::new(word_count_model(1.0, 0.0)),
        );
        let p = predictor.predict("quebrado", "", "planner", &[], 0.5);
        assert!(matches!(p, Prediction::Unscorable { ref reason } if reason.contains("extraction")));
    }

    #[test]
    fn test_narrow_embedding_is_unscorable() {
        let narrow = extractor().with_embedding_dim(64);
        let predictor =
            RelevancePredictor::with_classifier(narrow, Arc::new(word_count_model(1.0, 0.0)));
        let p = predictor.predict("curso", "", "planner", &[], 0.5);
        assert_eq!(p, Prediction::unscorable("invalid features"));
    }

    #[test]
    fn test_width_mismatch_is_unscorable() {
        let wide = extractor().with_embedding_dim(defaults::EMBEDDING_DIM + 10);
        let predictor =
            RelevancePredictor::with_classifier(wide, Arc::new(word_count_model(1.0, 0.0)));
        let p = predictor.predict("curso", "", "planner", &[], 0.5);
        assert_eq!(p, Prediction::unscorable("feature width mismatch"));
    }

    #[test]
    fn test_inference_failure_is_unscorable() {
        let predictor = RelevancePredictor::with_classifier(extractor(), Arc::new(FailingClassifier));
        let p = predictor.predict("curso", "", "planner", &[], 0.5);
        assert!(!p.is_relevant());
        assert!(matches!(p, Prediction::Unscorable { .. }));
    }

    #[test]
    fn test_lazy_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        word_count_model(2.0, -1.0).save(&path).unwrap();

        let predictor = RelevancePredictor::new(extractor(), &path);
        let p = predictor.predict("email marketing", "", "planner", &[], 0.5);
        assert!(p.is_relevant());

        // Cached: deleting the artifact does not affect later calls.
        std::fs::remove_file(&path).unwrap();
        assert!(predictor.predict("email marketing", "", "planner", &[], 0.5).is_relevant());
    }

    #[test]
    fn test_corrupt_model_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"version":"1","feature_names":[],"model":{"kind":"forest","trees":[]}}"#)
            .unwrap();

        let predictor = RelevancePredictor::new(extractor(), &path);
        assert!(!predictor.is_model_available());
        assert!(!predictor.predict("seo", "", "planner", &[], 0.5).is_relevant());
    }
}
