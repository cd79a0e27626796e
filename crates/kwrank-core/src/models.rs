//! Data model shared by every pipeline stage.
//!
//! All entities are transient: they are created and consumed within a single
//! pipeline invocation and only outlive it when a caller serializes them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::defaults;
use crate::error::Error;

// =============================================================================
// MARKET METRICS
// =============================================================================

/// Advertising competition tier reported for a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Competition {
    Low,
    Medium,
    High,
    /// The provider could not classify competition.
    Unknown,
}

impl Competition {
    /// Tiers a simulated source draws from.
    pub const SIMULATED: [Competition; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a comma-separated list of labels, e.g. `"low, medium"`.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, Error> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Competition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "baixa" => Ok(Self::Low),
            "medium" | "média" | "media" => Ok(Self::Medium),
            "high" | "alta" => Ok(Self::High),
            "unknown" | "desconhecida" => Ok(Self::Unknown),
            _ => Err(Error::InvalidInput(format!(
                "Invalid competition label: {}",
                s
            ))),
        }
    }
}

/// Market metrics attached to a candidate by the planner validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    /// Estimated monthly search volume.
    pub volume: u64,
    /// Estimated cost per click.
    pub cpc: f64,
    pub competition: Competition,
}

// =============================================================================
// SCORING
// =============================================================================

/// Weights combining volume and CPC into one score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub volume: f64,
    pub cpc: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            volume: defaults::WEIGHT_VOLUME,
            cpc: defaults::WEIGHT_CPC,
        }
    }
}

/// Detailed score with the contribution of each input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub volume_contrib: f64,
    pub cpc_contrib: f64,
    pub weight_volume: f64,
    pub weight_cpc: f64,
}

/// Rank-derived classification of a scored keyword within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Secondary,
    Support,
}

impl Tier {
    /// Tier for a position in a batch sorted by descending score.
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            0 => Self::Primary,
            r if r < defaults::SECONDARY_RANK_END => Self::Secondary,
            _ => Self::Support,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
            Self::Support => write!(f, "support"),
        }
    }
}

/// A candidate with market metrics, score and tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    #[serde(flatten)]
    pub metrics: MarketMetrics,
    pub score: f64,
    pub trace_id: String,
    pub tier: Tier,
}

// =============================================================================
// FEATURES
// =============================================================================

/// Named entity reported by an NLP capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// The entity text as it appears in the source.
    pub text: String,
    /// The entity type label (e.g., "org", "number", "proper").
    pub label: String,
}

/// Fixed-shape feature snapshot of one candidate.
///
/// Field order here is the model input order; see `FeatureRecord::NAMES`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub word_count: usize,
    pub char_count: usize,
    pub has_year: bool,
    pub entity_count: usize,
    pub has_modifier: bool,
    pub theme_equal: bool,
    pub origin: String,
    pub tag_count: usize,
    pub embedding: Vec<f32>,
}

impl FeatureRecord {
    /// Names of the scalar model inputs, in order. The embedding follows as
    /// `embed_0..embed_{n-1}`.
    pub const NAMES: [&'static str; 8] = [
        "word_count",
        "char_count",
        "has_year",
        "entity_count",
        "has_modifier",
        "theme_equal",
        "origin",
        "tag_count",
    ];

    /// Model input row: scalar features in `NAMES` order, then the embedding.
    ///
    /// `origin_code` is the categorical code the classifier artifact assigns
    /// to `self.origin`.
    pub fn to_row(&self, origin_code: f32) -> Vec<f32> {
        let mut row = Vec::with_capacity(Self::NAMES.len() + self.embedding.len());
        row.extend_from_slice(&[
            self.word_count as f32,
            self.char_count as f32,
            bool_feature(self.has_year),
            self.entity_count as f32,
            bool_feature(self.has_modifier),
            bool_feature(self.theme_equal),
            origin_code,
            self.tag_count as f32,
        ]);
        row.extend_from_slice(&self.embedding);
        row
    }
}

fn bool_feature(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

// =============================================================================
// PREDICTION
// =============================================================================

/// Outcome of the relevance gate for one candidate.
///
/// `Unscorable` is kept apart from a low-probability `Scored` outcome so that
/// failures stay visible; both are treated as not relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Prediction {
    Scored { probability: f64, relevant: bool },
    Unscorable { reason: String },
}

impl Prediction {
    pub fn scored(probability: f64, threshold: f64) -> Self {
        Self::Scored {
            probability,
            relevant: probability >= threshold,
        }
    }

    pub fn unscorable(reason: impl Into<String>) -> Self {
        Self::Unscorable {
            reason: reason.into(),
        }
    }

    pub fn is_relevant(&self) -> bool {
        matches!(self, Self::Scored { relevant: true, .. })
    }

    pub fn probability(&self) -> f64 {
        match self {
            Self::Scored { probability, .. } => *probability,
            Self::Unscorable { .. } => 0.0,
        }
    }

    /// Legacy `(is_relevant, score)` pair; unscorable maps to `(false, 0.0)`.
    pub fn as_pair(&self) -> (bool, f64) {
        (self.is_relevant(), self.probability())
    }
}

// =============================================================================
// PIPELINE RUN
// =============================================================================

/// Why a filtered candidate was not approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    NotRelevant { probability: f64 },
    Unscorable { detail: String },
    ClassificationFailed { detail: String },
}

/// A candidate rejected at the classification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedKeyword {
    pub keyword: String,
    pub reason: RejectReason,
}

/// Summary counts of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total: usize,
    pub validated: usize,
    pub filtered: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Rejected items that could not be evaluated at all.
    pub unscorable: usize,
    pub duration_ms: u64,
}

/// Aggregate result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub trace_id: String,
    pub candidates: Vec<String>,
    pub approved: Vec<ScoredKeyword>,
    pub rejected: Vec<RejectedKeyword>,
    pub metrics: RunMetrics,
    /// Callers must skip persistence when set.
    pub dry_run: bool,
}

impl PipelineRun {
    /// Texts of rejected candidates, for manual reprocessing.
    pub fn rejected_keywords(&self) -> Vec<&str> {
        self.rejected.iter().map(|r| r.keyword.as_str()).collect()
    }
}
