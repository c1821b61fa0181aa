//! Extraction quality scoring engine.
//!
//! Turns the raw text produced by an OCR / text-extraction backend into a
//! [`MetricSet`] and a weighted composite score, and ranks several backends'
//! results against each other. Everything in here is pure and synchronous:
//! no I/O, no shared mutable state, safe to call from any number of tasks.

pub mod compare;
pub mod heuristics;
pub mod metrics;
pub mod profiles;
pub mod scorer;

use serde::{Deserialize, Serialize};

pub use compare::{ComparisonAggregator, ComparisonReport};
pub use heuristics::HeuristicStrategy;
pub use profiles::{BackendId, BackendProfile, ProfileRegistry};
pub use scorer::{EvaluationMetadata, QualityScorer, ScoringWeights};

/// Derived statistics and sub-scores for one piece of extracted text.
///
/// Field names are the JSON contract consumed by the comparison UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub word_count: usize,
    pub line_count: usize,
    pub char_count: usize,
    pub avg_line_length: f64,
    pub confidence_score: f64,
    pub structure_score: f64,
    pub format_retention: f64,
}

/// Composite score plus the metric breakdown it was computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub composite_score: f64,
    pub metrics: MetricSet,
}

impl QualityResult {
    /// The result for empty, blank or non-textual input: every field zero.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Clamp a score into `[0, 1]`. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(0.42), 0.42);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }

    #[test]
    fn test_zero_result_serializes_with_contract_names() {
        let json = serde_json::to_value(QualityResult::zero()).unwrap();
        assert_eq!(json["composite_score"], 0.0);
        for key in [
            "word_count",
            "line_count",
            "char_count",
            "avg_line_length",
            "confidence_score",
            "structure_score",
            "format_retention",
        ] {
            assert!(json["metrics"].get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["metrics"]["word_count"], 0);
    }
}
