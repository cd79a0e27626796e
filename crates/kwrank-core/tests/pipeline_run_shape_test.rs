//! Verifies the serialized shape callers rely on when exporting a run.

use kwrank_core::{
    Competition, MarketMetrics, PipelineRun, RejectReason, RejectedKeyword, RunMetrics,
    ScoredKeyword, Tier,
};

fn sample_run() -> PipelineRun {
    PipelineRun {
        trace_id: "trace-123".to_string(),
        candidates: vec!["dicas marketing".to_string(), "curso gratis".to_string()],
        approved: vec![ScoredKeyword {
            keyword: "dicas marketing".to_string(),
            metrics: MarketMetrics {
                volume: 2400,
                cpc: 1.2,
                competition: Competition::Low,
            },
            score: 1260.0,
            trace_id: "trace-123".to_string(),
            tier: Tier::Primary,
        }],
        rejected: vec![RejectedKeyword {
            keyword: "curso gratis".to_string(),
            reason: RejectReason::NotRelevant { probability: 0.12 },
        }],
        metrics: RunMetrics {
            total: 2,
            validated: 2,
            filtered: 2,
            approved: 1,
            rejected: 1,
            unscorable: 0,
            duration_ms: 3,
        },
        dry_run: true,
    }
}

#[test]
fn test_run_serializes_top_level_keys() {
    let json = serde_json::to_value(sample_run()).unwrap();
    let obj = json.as_object().unwrap();

    for key in ["approved", "rejected", "trace_id", "metrics"] {
        assert!(obj.contains_key(key), "missing key {key}");
    }
    assert_eq!(json["metrics"]["total"], 2);
    assert_eq!(json["rejected"][0]["reason"]["kind"], "not_relevant");
    // Exported runs and log lines share the correlation key.
    assert!(obj.contains_key(kwrank_core::logging::TRACE_ID));
    assert_eq!(json["metrics"][kwrank_core::logging::DURATION_MS], 3);
}

#[test]
fn test_run_round_trips_through_json() {
    let run = sample_run();
    let json = serde_json::to_string(&run).unwrap();
    let back: PipelineRun = serde_json::from_str(&json).unwrap();
    assert_eq!(back, run);
}

#[test]
fn test_rejected_keywords_preserve_text() {
    let run = sample_run();
    assert_eq!(run.rejected_keywords(), vec!["curso gratis"]);
}
