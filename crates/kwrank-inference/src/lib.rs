//! # kwrank-inference
//!
//! Semantic side of the kwrank pipeline.
//!
//! This crate provides:
//! - Text normalization shared by every lexical feature
//! - A local NLP backend (gazetteer tagger + hashing embedder)
//! - Feature extraction into fixed-shape [`FeatureRecord`]s
//! - The JSON classifier artifact (logistic regression or decision forest)
//! - The fail-closed [`RelevancePredictor`]
//! - A logistic-regression trainer for the classifier artifact
//!
//! # Feature Flags
//!
//! - `mock`: expose [`mock::MockNlpBackend`] for downstream test suites
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kwrank_inference::{FeatureExtractor, LocalNlpBackend, RelevancePredictor};
//!
//! let extractor = FeatureExtractor::new(Arc::new(LocalNlpBackend::new()));
//! let predictor = RelevancePredictor::new(extractor, "models/relevance_model.json");
//! let prediction = predictor.predict("curso de marketing", "marketing", "planner", &[], 0.5);
//! println!("{:?}", prediction.as_pair());
//! ```

pub mod features;
pub mod local;
pub mod model;
pub mod predictor;
pub mod text;
pub mod train;

// Mock NLP backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use kwrank_core::*;

pub use features::{validate_features, FeatureExtractor};
pub use local::{HashingEmbedder, LocalNlpBackend};
pub use model::{DecisionTree, ModelKind, RelevanceModel, StandardScaler, TreeNode};
pub use predictor::RelevancePredictor;
pub use text::normalize;
pub use train::{load_examples, LabeledExample, Trainer, TrainingConfig, TrainingReport};
