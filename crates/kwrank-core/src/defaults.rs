//! Centralized default constants for kwrank.
//!
//! **This module is the single source of truth** for shared default values and
//! environment variable names. Other crates reference these constants instead
//! of defining their own magic numbers.

use crate::models::Competition;

// =============================================================================
// SCORING
// =============================================================================

/// Default weight applied to search volume.
pub const WEIGHT_VOLUME: f64 = 0.5;

/// Default weight applied to cost-per-click.
pub const WEIGHT_CPC: f64 = 0.5;

/// Scale constant applied to the CPC contribution so that CPC (single-digit
/// currency units) is comparable to volume (hundreds to thousands).
pub const CPC_SCALE: f64 = 100.0;

// =============================================================================
// FILTERING
// =============================================================================

/// Minimum monthly search volume for a keyword to pass the filter.
pub const MIN_VOLUME: u64 = 100;

/// Minimum score for a keyword to pass the filter.
pub const MIN_SCORE: f64 = 1000.0;

/// Competition labels accepted by default.
pub const COMPETITION_ALLOWED: [Competition; 2] = [Competition::Low, Competition::Medium];

// =============================================================================
// SIMULATED METRICS
// =============================================================================

/// Inclusive lower bound of simulated volume.
pub const MOCK_VOLUME_MIN: u64 = 100;

/// Inclusive upper bound of simulated volume.
pub const MOCK_VOLUME_MAX: u64 = 10_000;

/// Lower bound of simulated CPC.
pub const MOCK_CPC_MIN: f64 = 0.5;

/// Upper bound of simulated CPC.
pub const MOCK_CPC_MAX: f64 = 3.5;

// =============================================================================
// TIERING
// =============================================================================

/// Ranks below this index (excluding rank 0) are secondary; the rest support.
pub const SECONDARY_RANK_END: usize = 4;

// =============================================================================
// FEATURES / MODEL
// =============================================================================

/// Width every embedding is truncated or zero-padded to.
pub const EMBEDDING_DIM: usize = 300;

/// Minimum embedding width accepted by feature validation.
pub const MIN_EMBEDDING_DIM: usize = 100;

/// Probability at or above which a candidate is relevant.
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

/// Default classifier artifact location.
pub const MODEL_PATH: &str = "models/relevance_model.json";

/// Origin label used for candidates entering through the pipeline.
pub const ORIGIN: &str = "planner";

/// Modifier vocabulary matched against normalized text.
pub const MODIFIER_TERMS: &[&str] = &[
    "melhor",
    "mais barato",
    "top",
    "2024",
    "em promocao",
    "funcional",
    "best",
    "cheapest",
    "on sale",
];

/// Entities shorter than this (in characters) are not emitted as tags.
pub const MIN_TAG_CHARS: usize = 3;

// =============================================================================
// LONG-TAIL GENERATION
// =============================================================================

/// Minimum words for a generated phrase to count as long-tail.
pub const LONG_TAIL_MIN_WORDS: usize = 3;

/// Default learned-pattern store location.
pub const PATTERNS_PATH: &str = "data/learned_patterns.json";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_MODEL_PATH: &str = "KWRANK_MODEL_PATH";
pub const ENV_VALIDATOR_MODE: &str = "KWRANK_VALIDATOR_MODE";
pub const ENV_MIN_VOLUME: &str = "KWRANK_MIN_VOLUME";
pub const ENV_MIN_SCORE: &str = "KWRANK_MIN_SCORE";
pub const ENV_COMPETITION_ALLOWED: &str = "KWRANK_COMPETITION_ALLOWED";
pub const ENV_EXCLUDED_TERMS: &str = "KWRANK_EXCLUDED_TERMS";
pub const ENV_RELEVANCE_THRESHOLD: &str = "KWRANK_RELEVANCE_THRESHOLD";
pub const ENV_WEIGHT_VOLUME: &str = "KWRANK_WEIGHT_VOLUME";
pub const ENV_WEIGHT_CPC: &str = "KWRANK_WEIGHT_CPC";
pub const ENV_EMBEDDING_DIM: &str = "KWRANK_EMBEDDING_DIM";
pub const ENV_PATTERNS_PATH: &str = "KWRANK_PATTERNS_PATH";
