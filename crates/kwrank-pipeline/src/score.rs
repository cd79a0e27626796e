//! Heuristic keyword score from market metrics.
//!
//! `score = round2(volume * w_volume + cpc * w_cpc * CPC_SCALE)`
//!
//! CPC is scaled by 100 so that a cost per click of a few currency units
//! weighs comparably to search volumes in the thousands.

use kwrank_core::{defaults::CPC_SCALE, Error, Result, ScoreBreakdown, ScoreWeights};

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn check_inputs(volume: i64, cpc: f64, weights: &ScoreWeights) -> Result<()> {
    if volume < 0 {
        return Err(Error::InvalidInput(format!(
            "volume must be non-negative, got {}",
            volume
        )));
    }
    if !cpc.is_finite() || cpc < 0.0 {
        return Err(Error::InvalidInput(format!(
            "cpc must be a non-negative number, got {}",
            cpc
        )));
    }
    if !weights.volume.is_finite() || !weights.cpc.is_finite() {
        return Err(Error::InvalidInput("score weights must be finite".to_string()));
    }
    Ok(())
}

/// Score one keyword.
pub fn score(volume: i64, cpc: f64, weights: &ScoreWeights) -> Result<f64> {
    score_detailed(volume, cpc, weights).map(|b| b.score)
}

/// Score one keyword, keeping the contribution of each input.
pub fn score_detailed(volume: i64, cpc: f64, weights: &ScoreWeights) -> Result<ScoreBreakdown> {
    check_inputs(volume, cpc, weights)?;

    let volume_contrib = volume as f64 * weights.volume;
    let cpc_contrib = cpc * weights.cpc * CPC_SCALE;

    Ok(ScoreBreakdown {
        score: round2(volume_contrib + cpc_contrib),
        volume_contrib: round2(volume_contrib),
        cpc_contrib: round2(cpc_contrib),
        weight_volume: weights.volume,
        weight_cpc: weights.cpc,
    })
}
