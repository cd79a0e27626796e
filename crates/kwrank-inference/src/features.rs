//! Feature extraction for the relevance classifier.
//!
//! Converts a raw candidate into a [`FeatureRecord`]: lexical counts over the
//! normalized text, entity and embedding signals from the injected
//! [`NlpBackend`], and the caller-supplied theme, origin and tags.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use kwrank_core::{defaults, FeatureRecord, NlpBackend, Result};

use crate::text::normalize;

/// Four-digit year token of the 2000s.
static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b20\d{2}\b").expect("year pattern is valid"));

/// Builds feature records from candidate text.
#[derive(Clone)]
pub struct FeatureExtractor {
    nlp: Arc<dyn NlpBackend>,
    embedding_dim: usize,
    modifiers: Vec<String>,
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("nlp", &self.nlp.model_name())
            .field("embedding_dim", &self.embedding_dim)
            .field("modifiers", &self.modifiers.len())
            .finish()
    }
}

impl FeatureExtractor {
    /// Create an extractor with the default width and modifier vocabulary.
    pub fn new(nlp: Arc<dyn NlpBackend>) -> Self {
        Self {
            nlp,
            embedding_dim: defaults::EMBEDDING_DIM,
            modifiers: defaults::MODIFIER_TERMS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    /// Set the width embeddings are truncated or zero-padded to.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Replace the modifier vocabulary. Terms are normalized before use.
    pub fn with_modifiers<I, S>(mut self, modifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modifiers = modifiers
            .into_iter()
            .map(|m| normalize(m.as_ref()))
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    pub fn nlp(&self) -> &Arc<dyn NlpBackend> {
        &self.nlp
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Extract the feature record of one candidate.
    ///
    /// An empty (or punctuation-only) candidate yields zeroed features without
    /// consulting the NLP backend. Backend failures are returned as errors.
    pub fn extract(
        &self,
        text: &str,
        theme: &str,
        origin: &str,
        tags: &[String],
    ) -> Result<FeatureRecord> {
        let text_norm = normalize(text);
        let theme_norm = normalize(theme);

        let (entity_count, embedding) = if text_norm.is_empty() {
            (0, vec![0.0; self.embedding_dim])
        } else {
            let entities = self.nlp.entities(&text_norm)?;
            let raw = self.nlp.embed(&text_norm)?;
            (entities.len(), fit_width(raw, self.embedding_dim))
        };

        let record = FeatureRecord {
            word_count: text_norm.split_whitespace().count(),
            char_count: text_norm.chars().count(),
            has_year: YEAR_PATTERN.is_match(&text_norm),
            entity_count,
            has_modifier: self.modifiers.iter().any(|m| text_norm.contains(m.as_str())),
            theme_equal: text_norm == theme_norm,
            origin: origin.trim().to_lowercase(),
            tag_count: tags.len(),
            embedding,
        };

        trace!(
            candidate = %text,
            word_count = record.word_count,
            entity_count = record.entity_count,
            has_year = record.has_year,
            has_modifier = record.has_modifier,
            "Features extracted"
        );

        Ok(record)
    }
}

/// Truncate or zero-pad a vector to exactly `width` entries.
fn fit_width(mut vec: Vec<f32>, width: usize) -> Vec<f32> {
    vec.resize(width, 0.0);
    vec
}

/// Check a record is fit to feed the classifier: embedding at least
/// `MIN_EMBEDDING_DIM` wide with only finite values.
pub fn validate_features(record: &FeatureRecord) -> bool {
    record.embedding.len() >= defaults::MIN_EMBEDDING_DIM
        && record.embedding.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalNlpBackend;
    use crate::mock::MockNlpBackend;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(Arc::new(LocalNlpBackend::new()))
    }

    #[test]
    fn test_empty_text_yields_valid_zeroed_features() {
        let record = extractor().extract("", "tema", "origem", &[]).unwrap();

        assert_eq!(record.word_count, 0);
        assert_eq!(record.char_count, 0);
        assert_eq!(record.entity_count, 0);
        assert!(!record.has_year);
        assert!(!record.theme_equal);
        assert_eq!(record.origin, "origem");
        assert_eq!(record.embedding.len(), defaults::EMBEDDING_DIM);
        assert!(validate_features(&record));
    }

    #[test]
    fn test_empty_text_skips_backend() {
        let nlp = MockNlpBackend::new().with_failure_rate(1.0);
        let extractor = FeatureExtractor::new(Arc::new(nlp.clone()));
        assert!(extractor.extract("  ", "tema", "x", &[]).is_ok());
        assert!(nlp.get_calls().is_empty());
    }

    #[test]
    fn test_lexical_counts_use_normalized_text() {
        let record = extractor()
            .extract("Curso GRÁTIS de Marketing!", "marketing", "Reddit", &[])
            .unwrap();

        assert_eq!(record.word_count, 4);
        assert_eq!(record.char_count, "curso gratis de marketing".len());
        assert_eq!(record.origin, "reddit");
    }

    #[test]
    fn test_year_detection() {
        let ex = extractor();
        assert!(ex.extract("tendencias 2025", "", "o", &[]).unwrap().has_year);
        assert!(!ex.extract("top 1999 hits", "", "o", &[]).unwrap().has_year);
        assert!(!ex.extract("codigo 20255", "", "o", &[]).unwrap().has_year);
    }

    #[test]
    fn test_modifier_detection_ignores_accents() {
        let ex = extractor();
        assert!(ex.extract("tênis em promoção", "", "o", &[]).unwrap().has_modifier);
        assert!(ex.extract("o MELHOR curso", "", "o", &[]).unwrap().has_modifier);
        assert!(!ex.extract("curso de vendas", "", "o", &[]).unwrap().has_modifier);
    }

    #[test]
    fn test_custom_modifiers() {
        let ex = extractor().with_modifiers(["Grátis"]);
        assert!(ex.extract("ebook gratis", "", "o", &[]).unwrap().has_modifier);
        assert!(!ex.extract("o melhor ebook", "", "o", &[]).unwrap().has_modifier);
    }

    #[test]
    fn test_theme_equality_after_normalization() {
        let record = extractor()
            .extract("Marketing Digital!", "marketing digital", "o", &[])
            .unwrap();
        assert!(record.theme_equal);
    }

    #[test]
    fn test_tag_and_entity_counts() {
        let tags = vec!["instagram".to_string(), "ads".to_string()];
        let record = extractor()
            .extract("anuncios no instagram 2024", "", "o", &tags)
            .unwrap();
        assert_eq!(record.tag_count, 2);
        assert_eq!(record.entity_count, 2);
    }

    #[test]
    fn test_embedding_is_fit_to_width() {
        let narrow = FeatureExtractor::new(Arc::new(MockNlpBackend::new().with_dimension(50)))
            .with_embedding_dim(120);
        let record = narrow.extract("funil", "", "o", &[]).unwrap();
        assert_eq!(record.embedding.len(), 120);
        assert!(record.embedding[50..].iter().all(|v| *v == 0.0));

        let wide = FeatureExtractor::new(Arc::new(MockNlpBackend::new().with_dimension(512)));
        let record = wide.extract("funil", "", "o", &[]).unwrap();
        assert_eq!(record.embedding.len(), defaults::EMBEDDING_DIM);
    }

    #[test]
    fn test_backend_failure_propagates() {
        let nlp = MockNlpBackend::new().fail_on("quebrado");
        let extractor = FeatureExtractor::new(Arc::new(nlp));
        assert!(extractor.extract("quebrado", "", "o", &[]).is_err());
    }

    #[test]
    fn test_validate_rejects_narrow_embedding() {
        let mut record = extractor().extract("seo local", "", "o", &[]).unwrap();
        record.embedding.truncate(99);
        assert!(!validate_features(&record));
    }

    #[test]
    fn test_validate_rejects_non_finite_embedding() {
        let mut record = extractor().extract("seo local", "", "o", &[]).unwrap();
        record.embedding[0] = f32::NAN;
        assert!(!validate_features(&record));
    }
}
