//! Mock NLP backend for deterministic testing.
//!
//! Generates deterministic embeddings and entities, records every call, and
//! can be told to fail for specific inputs or at a given rate so tests can
//! exercise per-item failure handling.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kwrank_inference::mock::MockNlpBackend;
//! use kwrank_core::NlpBackend;
//!
//! let backend = MockNlpBackend::new()
//!     .with_dimension(128)
//!     .with_entity("marketing", "topic")
//!     .fail_on("broken keyword");
//!
//! assert_eq!(backend.embed("test text").unwrap().len(), 128);
//! assert!(backend.tags("broken keyword").is_err());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use kwrank_core::{Entity, Error, NlpBackend, Result};

/// Mock NLP backend for testing.
#[derive(Clone)]
pub struct MockNlpBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    entities: HashMap<String, String>,
    failing_inputs: HashSet<String>,
    failure_rate: f64,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: kwrank_core::defaults::EMBEDDING_DIM,
            entities: HashMap::new(),
            failing_inputs: HashSet::new(),
            failure_rate: 0.0,
        }
    }
}

impl MockNlpBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Report `word` as an entity with `label` wherever it appears.
    pub fn with_entity(mut self, word: impl Into<String>, label: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config)
            .entities
            .insert(word.into().to_lowercase(), label.into());
        self
    }

    /// Fail every call whose input equals `input`.
    pub fn fail_on(mut self, input: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config)
            .failing_inputs
            .insert(input.into());
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Number of calls for one operation ("entities" or "embed").
    pub fn call_count(&self, operation: &str) -> usize {
        self.get_calls()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    fn log_call(&self, operation: &str, input: &str) {
        if let Ok(mut log) = self.call_log.lock() {
            log.push(MockCall {
                operation: operation.to_string(),
                input: input.to_string(),
            });
        }
    }

    fn check_failure(&self, input: &str) -> Result<()> {
        if self.config.failing_inputs.contains(input) {
            return Err(Error::Nlp(format!("Simulated failure for '{}'", input)));
        }
        if self.config.failure_rate > 0.0 {
            use rand::Rng;
            if rand::thread_rng().gen::<f64>() < self.config.failure_rate {
                return Err(Error::Nlp("Simulated random failure".to_string()));
            }
        }
        Ok(())
    }

    /// Deterministic embedding from character codes, normalized to unit length.
    pub fn generate_embedding(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        if dimension == 0 {
            return vec;
        }

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }

        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
        vec
    }
}

impl Default for MockNlpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NlpBackend for MockNlpBackend {
    fn entities(&self, text: &str) -> Result<Vec<Entity>> {
        self.log_call("entities", text);
        self.check_failure(text)?;

        Ok(text
            .split_whitespace()
            .filter_map(|word| {
                let word = word.to_lowercase();
                self.config.entities.get(&word).map(|label| Entity {
                    text: word.clone(),
                    label: label.clone(),
                })
            })
            .collect())
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.log_call("embed", text);
        self.check_failure(text)?;
        Ok(Self::generate_embedding(text, self.config.dimension))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
