//! # kwrank-core
//!
//! Core types, traits, and abstractions for the kwrank keyword pipeline.
//!
//! This crate provides the data model shared by every pipeline stage, the
//! collaborator traits (NLP capability, market-metrics provider, classifier),
//! the error type, and environment-driven configuration.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{PipelineConfig, ValidatorMode};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;

/// Generate a new trace id (UUIDv7, time-ordered).
pub fn new_trace_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
