//! Hard-threshold keyword filter.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use kwrank_core::{defaults, Competition, PipelineConfig, ScoredKeyword};

/// Thresholds every keyword must meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub competition_allowed: Vec<Competition>,
    /// Case-insensitive substrings that exclude a keyword.
    pub excluded_terms: Vec<String>,
    pub min_volume: u64,
    pub min_score: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            competition_allowed: defaults::COMPETITION_ALLOWED.to_vec(),
            excluded_terms: Vec::new(),
            min_volume: defaults::MIN_VOLUME,
            min_score: defaults::MIN_SCORE,
        }
    }
}

impl From<&PipelineConfig> for FilterCriteria {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            competition_allowed: config.competition_allowed.clone(),
            excluded_terms: config.excluded_terms.clone(),
            min_volume: config.min_volume,
            min_score: config.min_score,
        }
    }
}

impl FilterCriteria {
    /// Why `item` fails the criteria, or `None` when it passes.
    pub fn rejection(&self, item: &ScoredKeyword) -> Option<&'static str> {
        if !self.competition_allowed.contains(&item.metrics.competition) {
            return Some("competition");
        }
        let keyword = item.keyword.to_lowercase();
        if self
            .excluded_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .any(|t| !t.is_empty() && keyword.contains(&t))
        {
            return Some("excluded_term");
        }
        if item.metrics.volume < self.min_volume {
            return Some("volume");
        }
        // NaN on either side fails the `score >= min_score` rule.
        if !matches!(
            item.score.partial_cmp(&self.min_score),
            Some(Ordering::Greater | Ordering::Equal)
        ) {
            return Some("score");
        }
        None
    }

    pub fn accepts(&self, item: &ScoredKeyword) -> bool {
        self.rejection(item).is_none()
    }
}

/// Filter stage holding its criteria.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    criteria: FilterCriteria,
}

impl KeywordFilter {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn filter(&self, items: &[ScoredKeyword]) -> Vec<ScoredKeyword> {
        filter_keywords(items, &self.criteria)
    }
}

/// Keep the items meeting every criterion, in input order.
pub fn filter_keywords(items: &[ScoredKeyword], criteria: &FilterCriteria) -> Vec<ScoredKeyword> {
    let kept: Vec<ScoredKeyword> = items
        .iter()
        .filter(|item| match criteria.rejection(item) {
            None => true,
            Some(rule) => {
                trace!(candidate = %item.keyword, rule, "Keyword filtered out");
                false
            }
        })
        .cloned()
        .collect();

    debug!(
        component = "filter",
        input_count = items.len(),
        output_count = kept.len(),
        "Filter applied"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwrank_core::{MarketMetrics, Tier};

    fn item(keyword: &str, volume: u64, score: f64, competition: Competition) -> ScoredKeyword {
        ScoredKeyword {
            keyword: keyword.to_string(),
            metrics: MarketMetrics {
                volume,
                cpc: 1.0,
                competition,
            },
            score,
            trace_id: "t".to_string(),
            tier: Tier::Support,
        }
    }

    fn batch() -> Vec<ScoredKeyword> {
        vec![
            item("curso de seo", 5000, 2600.0, Competition::Low),
            item("seo gratis", 5000, 2600.0, Competition::Medium),
            item("agencia seo", 5000, 2600.0, Competition::High),
            item("seo local", 90, 2600.0, Competition::Low),
            item("seo tecnico", 2000, 999.99, Competition::Low),
            item("seo on page", 100, 1000.0, Competition::Unknown),
        ]
    }

    #[test]
    fn test_default_criteria() {
        let kept = filter_keywords(&batch(), &FilterCriteria::default());
        let keywords: Vec<&str> = kept.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["curso de seo", "seo gratis"]);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let criteria = FilterCriteria {
            competition_allowed: vec![Competition::Unknown],
            ..FilterCriteria::default()
        };
        let kept = filter_keywords(&batch(), &criteria);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].keyword, "seo on page");
    }

    #[test]
    fn test_excluded_terms_case_insensitive() {
        let criteria = FilterCriteria {
            excluded_terms: vec!["GRATIS".to_string()],
            ..FilterCriteria::default()
        };
        let kept = filter_keywords(&batch(), &criteria);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].keyword, "curso de seo");
    }

    #[test]
    fn test_rejection_rule_names() {
        let criteria = FilterCriteria::default();
        let items = batch();
        assert_eq!(criteria.rejection(&items[0]), None);
        assert_eq!(criteria.rejection(&items[2]), Some("competition"));
        assert_eq!(criteria.rejection(&items[3]), Some("volume"));
        assert_eq!(criteria.rejection(&items[4]), Some("score"));
    }

    #[test]
    fn test_idempotent_and_pure() {
        let items = batch();
        let criteria = FilterCriteria::default();
        let once = filter_keywords(&items, &criteria);
        let twice = filter_keywords(&once, &criteria);
        assert_eq!(once, twice);
        assert_eq!(items, batch());
    }

    #[test]
    fn test_nan_min_score_keeps_nothing() {
        let criteria = FilterCriteria {
            min_score: f64::NAN,
            ..FilterCriteria::default()
        };
        let items = vec![item("curso de seo", 5000, 10.0, Competition::Low)];
        assert!(filter_keywords(&items, &criteria).is_empty());
        assert_eq!(criteria.rejection(&items[0]), Some("score"));
        assert!(filter_keywords(&batch(), &criteria).is_empty());
    }

    #[test]
    fn test_nan_score_is_rejected() {
        let items = vec![item("curso de seo", 5000, f64::NAN, Competition::Low)];
        assert!(filter_keywords(&items, &FilterCriteria::default()).is_empty());
    }

    #[test]
    fn test_default_competition_matches_config() {
        assert_eq!(
            FilterCriteria::default().competition_allowed,
            PipelineConfig::default().competition_allowed
        );
        assert_eq!(
            FilterCriteria::default().competition_allowed,
            defaults::COMPETITION_ALLOWED.to_vec()
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_keywords(&[], &FilterCriteria::default()).is_empty());
    }

    #[test]
    fn test_keyword_filter_from_config() {
        let config = PipelineConfig {
            min_volume: 6000,
            ..PipelineConfig::default()
        };
        let stage = KeywordFilter::new(FilterCriteria::from(&config));
        assert_eq!(stage.criteria().min_volume, 6000);
        assert!(stage.filter(&batch()).is_empty());
    }
}
