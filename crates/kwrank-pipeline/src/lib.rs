//! # kwrank-pipeline
//!
//! Keyword scoring, validation, filtering and relevance orchestration.
//!
//! This crate provides:
//! - The volume/CPC score calculator
//! - Market-metrics sources and the planner validator (metrics, score, tier)
//! - The hard-threshold keyword filter
//! - The pipeline orchestrator (VALIDATE → FILTER → CLASSIFY → DONE)
//! - Long-tail candidate generation with learned pattern priority
//! - The hand-off payload for downstream content generation
//!
//! ## Example
//!
//! ```rust,no_run
//! use kwrank_pipeline::{run_pipeline, PipelineConfig, PipelineOptions};
//!
//! let config = PipelineConfig::from_env();
//! let options = PipelineOptions {
//!     theme: "marketing digital".to_string(),
//!     ..PipelineOptions::from_config(&config)
//! };
//! let run = run_pipeline(&["curso de marketing digital"], &config, &options)?;
//! println!("{} approved", run.metrics.approved);
//! # Ok::<(), kwrank_pipeline::Error>(())
//! ```

pub mod filter;
pub mod handoff;
pub mod longtail;
pub mod metrics;
pub mod patterns;
pub mod pipeline;
pub mod planner;
pub mod score;

// Re-export core types
pub use kwrank_core::*;

pub use filter::{filter_keywords, FilterCriteria, KeywordFilter};
pub use handoff::{build_handoff, HandoffItem};
pub use longtail::{generate_long_tail, LongTailOptions, DEFAULT_MODIFIERS, DEFAULT_OPERATORS};
pub use metrics::SimulatedMetrics;
pub use patterns::{split_operator_modifier, PatternStore, ThemePatterns};
pub use pipeline::{run_pipeline, PipelineOptions, PipelineOrchestrator, PipelineStage};
pub use planner::{assign_tiers, PlannerValidator};
pub use score::{round2, score, score_detailed};
