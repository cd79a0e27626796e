//! Text normalization.
//!
//! Every lexical feature is computed on normalized text so that accents,
//! casing and punctuation never split otherwise-equal candidates.

use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics and drop ASCII punctuation.
///
/// Characters with no ASCII decomposition are dropped entirely. Surrounding
/// whitespace is trimmed; inner whitespace is kept as-is.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let ascii: String = lowered
        .nfkd()
        .filter(|c| c.is_ascii() && !c.is_ascii_punctuation())
        .collect();
    ascii.trim().to_string()
}

/// Normalize and collapse every whitespace run to a single space.
pub fn normalize_phrase(text: &str) -> String {
    normalize(text).split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Promoção Grátis"), "promocao gratis");
        assert_eq!(normalize("ESTRATÉGIA avançada"), "estrategia avancada");
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("  Dicas, truques & mais!  "), "dicas truques  mais");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  ?! "), "");
    }

    #[test]
    fn test_normalize_drops_non_latin() {
        assert_eq!(normalize("seo 東京"), "seo");
    }

    #[test]
    fn test_normalize_phrase_collapses_whitespace() {
        assert_eq!(normalize_phrase("  Dicas,   de \t SEO "), "dicas de seo");
    }
}
