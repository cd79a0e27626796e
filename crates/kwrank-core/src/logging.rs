//! Structured logging field name constants for kwrank.
//!
//! All crates use these constants for consistent structured logging fields,
//! so a run can be reassembled from its trace id in any log aggregator.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A run could not start (fatal input or configuration) |
//! | WARN  | Recoverable per-item failure, degraded model |
//! | INFO  | Run lifecycle (start, finish), model load |
//! | DEBUG | Stage counts, decision points |
//! | TRACE | Per-item values (metrics, probabilities) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation id of one pipeline invocation. Format: UUIDv7 unless supplied.
pub const TRACE_ID: &str = "trace_id";

/// Component originating the log event.
/// Values: "planner", "filter", "predictor", "pipeline", "trainer", "patterns"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Candidate keyword text.
pub const CANDIDATE: &str = "candidate";

/// Theme the candidate is evaluated against.
pub const THEME: &str = "theme";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of items entering a stage.
pub const INPUT_COUNT: &str = "input_count";

/// Number of items leaving a stage.
pub const OUTPUT_COUNT: &str = "output_count";

/// Relevance probability produced by the classifier.
pub const PROBABILITY: &str = "probability";

// ─── Model fields ──────────────────────────────────────────────────────────

/// Path of the classifier artifact.
pub const MODEL_PATH: &str = "model_path";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_unique_snake_case() {
        let fields = [
            TRACE_ID,
            COMPONENT,
            OPERATION,
            CANDIDATE,
            THEME,
            DURATION_MS,
            INPUT_COUNT,
            OUTPUT_COUNT,
            PROBABILITY,
            MODEL_PATH,
            ERROR_MSG,
        ];
        let unique: std::collections::HashSet<&str> = fields.iter().copied().collect();
        assert_eq!(unique.len(), fields.len());
        assert!(fields
            .iter()
            .all(|f| f.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
    }
}
