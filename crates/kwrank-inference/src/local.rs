//! Local NLP backend.
//!
//! A dependency-free [`NlpBackend`] for running the pipeline without an
//! external model server:
//!
//! - **Entities** come from a gazetteer of known names (brands, platforms,
//!   places) matched on word boundaries, plus numeric tokens.
//! - **Embeddings** come from feature hashing of words and character
//!   trigrams into a fixed-width, L2-normalized vector. Identical text always
//!   produces the identical vector.

use kwrank_core::{defaults, Entity, NlpBackend, Result};

use crate::text::normalize_phrase;

/// Known names recognized by default, with their entity label.
const DEFAULT_GAZETTEER: &[(&str, &str)] = &[
    ("google", "org"),
    ("google ads", "product"),
    ("youtube", "org"),
    ("instagram", "org"),
    ("facebook", "org"),
    ("linkedin", "org"),
    ("tiktok", "org"),
    ("whatsapp", "product"),
    ("amazon", "org"),
    ("mercado livre", "org"),
    ("shopify", "org"),
    ("hotmart", "org"),
    ("reddit", "org"),
    ("quora", "org"),
    ("discord", "org"),
    ("chatgpt", "product"),
    ("wordpress", "product"),
    ("excel", "product"),
    ("brasil", "place"),
    ("portugal", "place"),
    ("sao paulo", "place"),
    ("rio de janeiro", "place"),
    ("belo horizonte", "place"),
    ("lisboa", "place"),
];

/// Feature-hashing text embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed already-normalized text.
    ///
    /// Each word contributes a unit-weight bucket and each of its padded
    /// character trigrams a half-weight bucket; the sign of every
    /// contribution comes from the hash so collisions tend to cancel.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];

        for word in text.split_whitespace() {
            self.accumulate(&mut vec, word.as_bytes(), 1.0);

            let padded: Vec<char> = format!("#{}#", word).chars().collect();
            for window in padded.windows(3) {
                let gram: String = window.iter().collect();
                self.accumulate(&mut vec, gram.as_bytes(), 0.5);
            }
        }

        normalize_l2(&mut vec);
        vec
    }

    fn accumulate(&self, vec: &mut [f32], bytes: &[u8], weight: f32) {
        let hash = fnv1a(bytes);
        let idx = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        vec[idx] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(defaults::EMBEDDING_DIM)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn normalize_l2(vec: &mut [f32]) {
    let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        vec.iter_mut().for_each(|x| *x /= magnitude);
    }
}

/// Gazetteer tagger + hashing embedder.
#[derive(Debug, Clone)]
pub struct LocalNlpBackend {
    gazetteer: Vec<(String, String)>,
    embedder: HashingEmbedder,
}

impl LocalNlpBackend {
    /// Create a backend with the built-in gazetteer and default width.
    pub fn new() -> Self {
        Self {
            gazetteer: DEFAULT_GAZETTEER
                .iter()
                .map(|(name, label)| (name.to_string(), label.to_string()))
                .collect(),
            embedder: HashingEmbedder::default(),
        }
    }

    /// Set the embedding width.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.embedder = HashingEmbedder::new(dimension);
        self
    }

    /// Add known names under `label`. Names are normalized before matching.
    pub fn with_entities<I, S>(mut self, names: I, label: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = normalize_phrase(name.as_ref());
            if !name.is_empty() && !self.gazetteer.iter().any(|(n, _)| *n == name) {
                self.gazetteer.push((name, label.to_string()));
            }
        }
        self
    }
}

impl Default for LocalNlpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NlpBackend for LocalNlpBackend {
    fn entities(&self, text: &str) -> Result<Vec<Entity>> {
        let norm = normalize_phrase(text);
        if norm.is_empty() {
            return Ok(Vec::new());
        }

        let padded = format!(" {} ", norm);
        let mut entities: Vec<Entity> = self
            .gazetteer
            .iter()
            .filter(|(name, _)| padded.contains(&format!(" {} ", name)))
            .map(|(name, label)| Entity {
                text: name.clone(),
                label: label.clone(),
            })
            .collect();

        for token in norm.split_whitespace() {
            if token.chars().all(|c| c.is_ascii_digit()) {
                let label = if token.len() == 4 && token.starts_with("20") {
                    "date"
                } else {
                    "number"
                };
                entities.push(Entity {
                    text: token.to_string(),
                    label: label.to_string(),
                });
            }
        }

        Ok(entities)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embedder.embed(&normalize_phrase(text)))
    }

    fn model_name(&self) -> &str {
        "local-hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_deterministic() {
        let embedder = HashingEmbedder::new(128);
        assert_eq!(embedder.embed("email marketing"), embedder.embed("email marketing"));
    }

    #[test]
    fn test_embedding_normalized() {
        let embedding = HashingEmbedder::new(300).embed("curso de marketing digital");
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4, "Should be normalized");
        assert_eq!(embedding.len(), 300);
    }

    #[test]
    fn test_embedding_empty_text_is_zero() {
        let embedding = HashingEmbedder::new(100).embed("");
        assert!(embedding.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_similar_text_closer_than_unrelated() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("marketing digital");
        let b = embedder.embed("marketing digital gratis");
        let c = embedder.embed("receita de bolo");

        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    #[test]
    fn test_entities_from_gazetteer() {
        let nlp = LocalNlpBackend::new();
        let entities = nlp.entities("Anúncios no Google Ads em São Paulo").unwrap();
        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();

        assert!(texts.contains(&"google"));
        assert!(texts.contains(&"google ads"));
        assert!(texts.contains(&"sao paulo"));
    }

    #[test]
    fn test_entities_respect_word_boundaries() {
        let nlp = LocalNlpBackend::new();
        let entities = nlp.entities("googlebot crawler").unwrap();
        assert!(entities.is_empty());
    }

    #[test]
    fn test_numeric_entities() {
        let nlp = LocalNlpBackend::new();
        let entities = nlp.entities("melhores cursos 2025 top 10").unwrap();
        let labels: Vec<(&str, &str)> = entities
            .iter()
            .map(|e| (e.text.as_str(), e.label.as_str()))
            .collect();
        assert_eq!(labels, vec![("2025", "date"), ("10", "number")]);
    }

    #[test]
    fn test_custom_entities_and_tags() {
        let nlp = LocalNlpBackend::new().with_entities(["RD Station"], "org");
        let tags = nlp.tags("integração rd station com instagram").unwrap();
        assert_eq!(tags, vec!["instagram".to_string(), "rd station".to_string()]);
    }
}
