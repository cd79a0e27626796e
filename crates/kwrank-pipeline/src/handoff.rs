//! Hand-off payload for the downstream content generator.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kwrank_core::{ScoredKeyword, Tier};

/// One approved keyword handed to the content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffItem {
    pub keyword: String,
    pub niche: String,
    /// Tier of the keyword: `primary` or `secondary`.
    pub category: Tier,
    pub theme: String,
    pub score: f64,
    pub trace_id: String,
}

/// Build the payload from approved keywords.
///
/// Only primary and secondary keywords with a non-empty text and trace id are
/// included; support keywords are skipped silently, incomplete ones with a
/// warning.
pub fn build_handoff(approved: &[ScoredKeyword], theme: &str, niche: &str) -> Vec<HandoffItem> {
    let mut payload = Vec::new();

    for item in approved {
        if item.tier == Tier::Support {
            continue;
        }
        if item.keyword.trim().is_empty() || item.trace_id.trim().is_empty() {
            warn!(candidate = %item.keyword, trace_id = %item.trace_id, "Skipping incomplete keyword");
            continue;
        }
        payload.push(HandoffItem {
            keyword: item.keyword.clone(),
            niche: niche.to_string(),
            category: item.tier,
            theme: theme.to_string(),
            score: item.score,
            trace_id: item.trace_id.clone(),
        });
    }

    debug!(
        input_count = approved.len(),
        output_count = payload.len(),
        "Hand-off payload built"
    );
    payload
}
