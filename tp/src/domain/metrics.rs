//! Confidence metrics and levels
//!
//! Five independent quality scores in [0,1] plus the derived overall score.
//! The overall score is a weighted average of four of them; experience
//! quality is advisory only. Metrics are recomputed fresh on every critique
//! pass and never merged across itinerary versions.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weight applied to metric keys without an explicit weight
const DEFAULT_METRIC_WEIGHT: f64 = 0.1;

/// Discrete confidence bucket derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Bucket an overall score using the configured thresholds
    pub fn from_score(overall: f64, high_threshold: f64, medium_threshold: f64) -> Self {
        debug!(overall, high_threshold, medium_threshold, "ConfidenceLevel::from_score: called");
        if overall >= high_threshold {
            Self::High
        } else if overall >= medium_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Quality scores for one itinerary version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    /// How well total cost fits the budget
    pub budget_score: f64,
    /// Is the timeline realistic?
    pub feasibility_score: f64,
    /// Does it match stated preferences?
    pub preference_match_score: f64,
    /// Are all necessary details included?
    pub completeness_score: f64,
    /// Experience quality; advisory, excluded from the overall score
    pub quality_score: f64,
    /// Weighted average of the four scored dimensions
    pub overall_score: f64,
}

impl ConfidenceMetrics {
    /// Assemble metrics and derive the overall score
    pub fn new(budget: f64, feasibility: f64, preference: f64, completeness: f64, quality: f64) -> Self {
        let overall = weighted_overall(&[
            ("budget_score", budget),
            ("feasibility_score", feasibility),
            ("preference_match_score", preference),
            ("completeness_score", completeness),
        ]);
        debug!(budget, feasibility, preference, completeness, quality, overall, "ConfidenceMetrics::new: called");

        Self {
            budget_score: budget,
            feasibility_score: feasibility,
            preference_match_score: preference,
            completeness_score: completeness,
            quality_score: quality,
            overall_score: overall,
        }
    }
}

/// Weighted average over named sub-scores
///
/// Known keys carry fixed weights; anything else gets the default weight so
/// an extended metric set still produces a sane overall score.
pub fn weighted_overall(metrics: &[(&str, f64)]) -> f64 {
    debug!(metric_count = metrics.len(), "weighted_overall: called");
    if metrics.is_empty() {
        return 0.0;
    }

    let mut total_score = 0.0;
    let mut total_weight = 0.0;

    for (name, score) in metrics {
        let weight = match *name {
            "budget_score" => 0.3,
            "feasibility_score" => 0.3,
            "preference_match_score" => 0.2,
            "completeness_score" => 0.2,
            _ => DEFAULT_METRIC_WEIGHT,
        };
        total_score += score * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 { total_score / total_weight } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_from_score_thresholds() {
        assert_eq!(ConfidenceLevel::from_score(0.85, 0.8, 0.6), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.8, 0.8, 0.6), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.7, 0.8, 0.6), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.6, 0.8, 0.6), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.59, 0.8, 0.6), ConfidenceLevel::Low);
    }

    #[test]
    fn test_weighted_overall_known_keys() {
        let overall = weighted_overall(&[
            ("budget_score", 1.0),
            ("feasibility_score", 1.0),
            ("preference_match_score", 0.0),
            ("completeness_score", 0.0),
        ]);

        // (0.3 + 0.3) / (0.3 + 0.3 + 0.2 + 0.2)
        assert!((overall - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_overall_unknown_key_gets_default_weight() {
        let overall = weighted_overall(&[("budget_score", 1.0), ("novelty_score", 0.0)]);

        // 0.3 / (0.3 + 0.1)
        assert!((overall - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_overall_empty() {
        assert_eq!(weighted_overall(&[]), 0.0);
    }

    proptest! {
        #[test]
        fn prop_overall_in_unit_interval(
            b in 0.0f64..=1.0,
            f in 0.0f64..=1.0,
            p in 0.0f64..=1.0,
            c in 0.0f64..=1.0,
        ) {
            let m = ConfidenceMetrics::new(b, f, p, c, 0.5);
            prop_assert!(m.overall_score >= 0.0);
            prop_assert!(m.overall_score <= 1.0);
        }
    }
}
