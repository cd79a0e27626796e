//! Market-metrics sources.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use kwrank_core::defaults::{MOCK_CPC_MAX, MOCK_CPC_MIN, MOCK_VOLUME_MAX, MOCK_VOLUME_MIN};
use kwrank_core::{Competition, Error, MarketMetrics, MetricsProvider, Result};

use crate::score::round2;

/// Simulated metrics for mock validation runs.
///
/// Volume is uniform in `[100, 10000]`, CPC uniform in `[0.5, 3.5]` rounded
/// to cents, competition uniform over low/medium/high.
pub struct SimulatedMetrics {
    rng: Mutex<StdRng>,
}

impl SimulatedMetrics {
    /// Entropy-seeded source.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible source for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SimulatedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for SimulatedMetrics {
    fn fetch(&self, _term: &str) -> Result<MarketMetrics> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| Error::Internal("simulated metrics rng poisoned".to_string()))?;

        let volume = rng.gen_range(MOCK_VOLUME_MIN..=MOCK_VOLUME_MAX);
        let cpc = round2(rng.gen_range(MOCK_CPC_MIN..=MOCK_CPC_MAX));
        let competition = *Competition::SIMULATED
            .choose(&mut *rng)
            .ok_or_else(|| Error::Internal("no simulated competition tiers".to_string()))?;

        Ok(MarketMetrics {
            volume,
            cpc,
            competition,
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_within_ranges() {
        let source = SimulatedMetrics::seeded(7);
        for _ in 0..500 {
            let m = source.fetch("x").unwrap();
            assert!((MOCK_VOLUME_MIN..=MOCK_VOLUME_MAX).contains(&m.volume));
            assert!(m.cpc >= MOCK_CPC_MIN && m.cpc <= MOCK_CPC_MAX);
            assert_eq!(m.cpc, round2(m.cpc));
            assert_ne!(m.competition, Competition::Unknown);
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = SimulatedMetrics::seeded(42);
        let b = SimulatedMetrics::seeded(42);
        for term in ["a", "b", "c"] {
            assert_eq!(a.fetch(term).unwrap(), b.fetch(term).unwrap());
        }
    }
}
