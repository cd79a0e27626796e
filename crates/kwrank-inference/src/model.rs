//! Classifier artifact.
//!
//! The trained relevance classifier is stored as a JSON document so it can be
//! produced by the bundled trainer or exported from another toolchain. Two
//! model families are supported:
//!
//! - `logistic`: linear coefficients + intercept through a sigmoid
//! - `forest`: binary decision trees in node-array form; leaf class
//!   probabilities are averaged across trees
//!
//! An optional standard scaler is applied to every row before the model.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kwrank_core::{Error, FeatureRecord, ProbabilisticClassifier, Result};

/// Current artifact format version.
pub const ARTIFACT_VERSION: &str = "1";

/// Per-column standardization `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a set of equally wide rows. Zero-variance columns get scale 1.
    pub fn fit(rows: &[Vec<f32>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += f64::from(*x) / n;
            }
        }

        let mut var = vec![0.0; width];
        for row in rows {
            for ((v, m), x) in var.iter_mut().zip(&mean).zip(row) {
                let d = f64::from(*x) - m;
                *v += d * d / n;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let s = v.sqrt();
                if s > f64::EPSILON {
                    s
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (f64::from(*x) - m) / s)
            .collect()
    }
}

/// One node of a decision tree. Leaves have no `feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: usize,
    #[serde(default)]
    pub right: usize,
    /// Class weights `[negative, positive]` at this node (counts or
    /// probabilities; normalized on use).
    #[serde(default)]
    pub value: [f64; 2],
}

/// Binary decision tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Positive-class probability for one (scaled) row.
    ///
    /// Goes left when `row[feature] <= threshold`.
    fn predict_positive(&self, row: &[f64]) -> Result<f64> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| Error::Model(format!("tree node {} out of range", idx)))?;

            match node.feature {
                None => {
                    let total = node.value[0] + node.value[1];
                    if total <= 0.0 {
                        return Err(Error::Model(format!("leaf {} has no class weight", idx)));
                    }
                    return Ok(node.value[1] / total);
                }
                Some(feature) => {
                    let x = row.get(feature).ok_or_else(|| {
                        Error::Model(format!("tree feature {} out of range", feature))
                    })?;
                    idx = if *x <= node.threshold {
                        node.left
                    } else {
                        node.right
                    };
                }
            }
        }
        Err(Error::Model("decision tree contains a cycle".to_string()))
    }
}

/// Model family and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    Logistic { coefficients: Vec<f64>, intercept: f64 },
    Forest { trees: Vec<DecisionTree> },
}

/// The persisted relevance classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceModel {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
    /// Input column names, in order.
    pub feature_names: Vec<String>,
    /// Known origin labels; an origin's code is its index + 1.
    #[serde(default)]
    pub origin_vocabulary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
    pub model: ModelKind,
}

impl RelevanceModel {
    /// Column names for an embedding of width `embedding_dim`.
    pub fn feature_names_for(embedding_dim: usize) -> Vec<String> {
        FeatureRecord::NAMES
            .iter()
            .map(|n| n.to_string())
            .chain((0..embedding_dim).map(|i| format!("embed_{}", i)))
            .collect()
    }

    /// Load and check an artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&content)?;
        model.check()?;
        Ok(model)
    }

    /// Write the artifact as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Verify internal consistency of the artifact.
    pub fn check(&self) -> Result<()> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(Error::Model("artifact declares no features".to_string()));
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(Error::Model(format!(
                    "scaler width {}/{} does not match {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                )));
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(Error::Model("scaler has zero or non-finite scale".to_string()));
            }
        }

        match &self.model {
            ModelKind::Logistic { coefficients, .. } => {
                if coefficients.len() != n {
                    return Err(Error::Model(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        n
                    )));
                }
            }
            ModelKind::Forest { trees } => {
                if trees.is_empty() {
                    return Err(Error::Model("forest has no trees".to_string()));
                }
                for tree in trees {
                    if tree.nodes.is_empty() {
                        return Err(Error::Model("forest contains an empty tree".to_string()));
                    }
                    for node in &tree.nodes {
                        if let Some(feature) = node.feature {
                            if feature >= n
                                || node.left >= tree.nodes.len()
                                || node.right >= tree.nodes.len()
                            {
                                return Err(Error::Model(
                                    "tree node references out of range".to_string(),
                                ));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn positive_probability(&self, row: &[f32]) -> Result<f64> {
        let n = self.feature_names.len();
        if row.len() != n {
            return Err(Error::Model(format!(
                "row has {} columns, model expects {}",
                row.len(),
                n
            )));
        }

        let x: Vec<f64> = match &self.scaler {
            Some(scaler) => scaler.transform(row),
            None => row.iter().map(|v| f64::from(*v)).collect(),
        };

        let p = match &self.model {
            ModelKind::Logistic {
                coefficients,
                intercept,
            } => {
                let z = intercept + coefficients.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>();
                sigmoid(z)
            }
            ModelKind::Forest { trees } => {
                let mut sum = 0.0;
                for tree in trees {
                    sum += tree.predict_positive(&x)?;
                }
                sum / trees.len() as f64
            }
        };

        if !p.is_finite() {
            return Err(Error::Model("non-finite probability".to_string()));
        }
        Ok(p.clamp(0.0, 1.0))
    }
}

impl ProbabilisticClassifier for RelevanceModel {
    fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<[f64; 2]>> {
        rows.iter()
            .map(|row| self.positive_probability(row).map(|p| [1.0 - p, p]))
            .collect()
    }

    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn origin_code(&self, origin: &str) -> f32 {
        self.origin_vocabulary
            .iter()
            .position(|o| o == origin)
            .map(|i| (i + 1) as f32)
            .unwrap_or(0.0)
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
