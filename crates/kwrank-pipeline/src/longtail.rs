//! Long-tail candidate generator.
//!
//! Expands a theme into multi-word phrases by combining intent operators
//! (`"como fazer"`) and modifiers (`"para iniciantes"`) around it.

use std::collections::HashSet;

use tracing::debug;

use kwrank_core::defaults;
use kwrank_inference::text::normalize_phrase;

use crate::patterns::PatternStore;

/// Default intent operators, placed before the theme.
pub const DEFAULT_OPERATORS: &[&str] = &[
    "como fazer",
    "o que e",
    "para que serve",
    "exemplos de",
    "vantagens do",
    "passo a passo de",
    "melhores estrategias de",
    "dicas de",
    "como funciona",
    "por que usar",
    "segredos do",
];

/// Default modifiers, placed after the theme.
pub const DEFAULT_MODIFIERS: &[&str] = &[
    "para iniciantes",
    "com resultados",
    "passo a passo",
    "gratuito",
    "rapido",
    "eficiente",
    "sem gastar muito",
    "com alta conversao",
];

/// Generation options.
#[derive(Debug, Clone)]
pub struct LongTailOptions {
    pub operators: Vec<String>,
    pub modifiers: Vec<String>,
    /// Phrases with fewer words are dropped.
    pub min_words: usize,
    /// Sort by (word count, text); otherwise keep generation order.
    pub sort: bool,
}

impl Default for LongTailOptions {
    fn default() -> Self {
        Self {
            operators: DEFAULT_OPERATORS.iter().map(|s| s.to_string()).collect(),
            modifiers: DEFAULT_MODIFIERS.iter().map(|s| s.to_string()).collect(),
            min_words: defaults::LONG_TAIL_MIN_WORDS,
            sort: true,
        }
    }
}

/// Put `learned` first, followed by the defaults not already learned.
fn prioritize(learned: Vec<String>, defaults: &[String]) -> Vec<String> {
    let mut out = learned;
    for d in defaults {
        if !out.contains(d) {
            out.push(d.clone());
        }
    }
    out
}

/// Generate long-tail phrases for `theme`.
///
/// Produces `op theme`, `theme mod` and `op theme mod`, keeps phrases with at
/// least `min_words` words, and drops structural duplicates (phrases with the
/// same multiset of words). When `patterns` is given, operators and modifiers
/// learned for the theme are tried first.
pub fn generate_long_tail(
    theme: &str,
    options: &LongTailOptions,
    patterns: Option<&PatternStore>,
) -> Vec<String> {
    let theme = normalize_phrase(theme);
    if theme.is_empty() {
        return Vec::new();
    }

    let (operators, modifiers) = match patterns {
        Some(store) => {
            let learned = store.patterns(&theme);
            (
                prioritize(learned.ranked_operators(), &options.operators),
                prioritize(learned.ranked_modifiers(), &options.modifiers),
            )
        }
        None => (options.operators.clone(), options.modifiers.clone()),
    };

    let mut phrases = Vec::new();
    phrases.extend(operators.iter().map(|op| format!("{} {}", op, theme)));
    phrases.extend(modifiers.iter().map(|m| format!("{} {}", theme, m)));
    for op in &operators {
        for m in &modifiers {
            phrases.push(format!("{} {} {}", op, theme, m));
        }
    }

    let mut seen = HashSet::new();
    let mut result: Vec<String> = phrases
        .into_iter()
        .map(|p| normalize_phrase(&p))
        .filter(|p| p.split_whitespace().count() >= options.min_words)
        .filter(|p| {
            let mut key: Vec<&str> = p.split_whitespace().collect();
            key.sort_unstable();
            seen.insert(key.join(" "))
        })
        .collect();

    if options.sort {
        result.sort_by(|a, b| {
            a.split_whitespace()
                .count()
                .cmp(&b.split_whitespace().count())
                .then_with(|| a.cmp(b))
        });
    }

    debug!(theme = %theme, output_count = result.len(), "Long-tail phrases generated");
    result
}
