//! Trainer for the relevance classifier artifact.
//!
//! Reads labeled examples (JSONL), extracts features with the same
//! [`FeatureExtractor`] used at prediction time, fits a standard scaler and an
//! L2-regularized logistic regression by batch gradient descent, and reports
//! hold-out metrics.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kwrank_core::{Error, Result};

use crate::features::{validate_features, FeatureExtractor};
use crate::model::{sigmoid, ModelKind, RelevanceModel, StandardScaler, ARTIFACT_VERSION};

fn default_origin() -> String {
    "unknown".to_string()
}

/// One labeled training line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub theme: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub relevant: bool,
}

/// Load labeled examples from a JSONL file. Blank lines are skipped;
/// malformed lines are skipped with a warning.
pub fn load_examples(path: &Path) -> Result<Vec<LabeledExample>> {
    let content = std::fs::read_to_string(path)?;
    let mut examples = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LabeledExample>(line) {
            Ok(example) => examples.push(example),
            Err(e) => warn!(line = line_no + 1, error = %e, "Skipping malformed training line"),
        }
    }

    Ok(examples)
}

/// Hyper-parameters of the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    /// Share of examples held out for evaluation.
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
            l2: 1e-3,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Hold-out evaluation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model: String,
    pub version: String,
    pub trained_at: chrono::DateTime<Utc>,
    pub n_train: usize,
    pub n_test: usize,
    pub skipped: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub features: Vec<String>,
}

impl TrainingReport {
    /// Write the report as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Fits [`RelevanceModel`]s from labeled examples.
pub struct Trainer<'a> {
    extractor: &'a FeatureExtractor,
    config: TrainingConfig,
}

impl<'a> Trainer<'a> {
    pub fn new(extractor: &'a FeatureExtractor) -> Self {
        Self {
            extractor,
            config: TrainingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Train a logistic model and evaluate it on a seeded hold-out split.
    pub fn train(&self, examples: &[LabeledExample]) -> Result<(RelevanceModel, TrainingReport)> {
        let mut records = Vec::with_capacity(examples.len());
        let mut skipped = 0;
        for example in examples {
            match self
                .extractor
                .extract(&example.text, &example.theme, &example.origin, &example.tags)
            {
                Ok(features) if validate_features(&features) => {
                    records.push((features, example.relevant))
                }
                Ok(_) => skipped += 1,
                Err(e) => {
                    warn!(candidate = %example.text, error = %e, "Skipping example");
                    skipped += 1;
                }
            }
        }

        if records.is_empty() {
            return Err(Error::InvalidInput(
                "no valid training examples".to_string(),
            ));
        }
        let positives = records.iter().filter(|(_, label)| *label).count();
        if positives == 0 || positives == records.len() {
            return Err(Error::InvalidInput(
                "training data must contain both relevant and non-relevant examples".to_string(),
            ));
        }

        let origin_vocabulary: Vec<String> = records
            .iter()
            .map(|(f, _)| f.origin.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let origin_code = |origin: &str| {
            origin_vocabulary
                .iter()
                .position(|o| o == origin)
                .map(|i| (i + 1) as f32)
                .unwrap_or(0.0)
        };

        let mut data: Vec<(Vec<f32>, bool)> = records
            .iter()
            .map(|(f, label)| (f.to_row(origin_code(&f.origin)), *label))
            .collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        data.shuffle(&mut rng);

        let n_test = if data.len() < 5 {
            0
        } else {
            ((data.len() as f64) * self.config.test_fraction.clamp(0.0, 0.5)).round() as usize
        };
        let (test, train) = data.split_at(n_test);

        let train_rows: Vec<Vec<f32>> = train.iter().map(|(row, _)| row.clone()).collect();
        let scaler = StandardScaler::fit(&train_rows);
        let scaled: Vec<Vec<f64>> = train_rows.iter().map(|r| scaler.transform(r)).collect();
        let labels: Vec<f64> = train
            .iter()
            .map(|(_, label)| if *label { 1.0 } else { 0.0 })
            .collect();

        let (coefficients, intercept) = self.fit_logistic(&scaled, &labels);

        let model = RelevanceModel {
            version: ARTIFACT_VERSION.to_string(),
            trained_at: Some(Utc::now()),
            feature_names: RelevanceModel::feature_names_for(self.extractor.embedding_dim()),
            origin_vocabulary,
            scaler: Some(scaler),
            model: ModelKind::Logistic {
                coefficients,
                intercept,
            },
        };
        model.check()?;

        // Small datasets are evaluated on the training set.
        let eval = if test.is_empty() { train } else { test };
        let (accuracy, precision, recall) = evaluate(&model, eval)?;

        let report = TrainingReport {
            model: "logistic".to_string(),
            version: model.version.clone(),
            trained_at: model.trained_at.unwrap_or_else(Utc::now),
            n_train: train.len(),
            n_test: test.len(),
            skipped,
            accuracy,
            precision,
            recall,
            features: model.feature_names.clone(),
        };

        info!(
            n_train = report.n_train,
            n_test = report.n_test,
            skipped = report.skipped,
            accuracy = report.accuracy,
            "Relevance model trained"
        );

        Ok((model, report))
    }

    fn fit_logistic(&self, rows: &[Vec<f64>], labels: &[f64]) -> (Vec<f64>, f64) {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len().max(1) as f64;
        let mut weights = vec![0.0; width];
        let mut bias = 0.0;

        for _ in 0..self.config.epochs {
            let mut grad_w = vec![0.0; width];
            let mut grad_b = 0.0;

            for (row, y) in rows.iter().zip(labels) {
                let z = bias + weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>();
                let err = sigmoid(z) - y;
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += err * x;
                }
                grad_b += err;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= self.config.learning_rate * (g / n + self.config.l2 * *w);
            }
            bias -= self.config.learning_rate * grad_b / n;
        }

        (weights, bias)
    }
}

fn evaluate(model: &RelevanceModel, data: &[(Vec<f32>, bool)]) -> Result<(f64, f64, f64)> {
    use kwrank_core::ProbabilisticClassifier;

    let rows: Vec<Vec<f32>> = data.iter().map(|(row, _)| row.clone()).collect();
    let probs = model.predict_proba(&rows)?;

    let (mut tp, mut fp, mut tn, mut fneg) = (0usize, 0usize, 0usize, 0usize);
    for (p, (_, label)) in probs.iter().zip(data) {
        match (p[1] >= 0.5, *label) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fneg += 1,
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    Ok((
        ratio(tp + tn, data.len()),
        ratio(tp, tp + fp),
        ratio(tp, tp + fneg),
    ))
}
