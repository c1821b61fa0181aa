//! Structure / format heuristics, one small pure function per backend family.

use serde::{Deserialize, Serialize};

use super::metrics::MetricExtractor;
use super::profiles::BackendProfile;
use super::MetricSet;

/// Structure and format score assigned when nothing better is known.
pub const FALLBACK_SUB_SCORE: f64 = 0.5;

/// Bonus per detected category in the pattern-bonus heuristic.
pub const PATTERN_BONUS: f64 = 0.05;

/// Which heuristic a backend's sub-scores come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeuristicStrategy {
    /// Markdown-producing VLM: headings / tables / rules, code fences or emphasis.
    MarkdownVlm,
    /// VLM answering with labelled sections (`Title:`, `Heading:`, `List:`).
    LabeledVlm,
    /// High-accuracy markdown VLM with richer format markers.
    HighAccuracyVlm,
    /// Constant scores regardless of text.
    Fixed { structure: f64, format: f64 },
    /// Baseline confidence plus a bonus per detected structure / format category.
    PatternBonus,
}

/// `(structure_score, format_retention)` before clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub structure: f64,
    pub format: f64,
}

impl HeuristicStrategy {
    pub fn fallback() -> Self {
        HeuristicStrategy::Fixed {
            structure: FALLBACK_SUB_SCORE,
            format: FALLBACK_SUB_SCORE,
        }
    }

    pub fn apply(&self, text: &str, metrics: &MetricSet, profile: &BackendProfile) -> SubScores {
        match *self {
            HeuristicStrategy::MarkdownVlm => markdown_vlm(text),
            HeuristicStrategy::LabeledVlm => labeled_vlm(text, metrics),
            HeuristicStrategy::HighAccuracyVlm => high_accuracy_vlm(text),
            HeuristicStrategy::Fixed { structure, format } => SubScores { structure, format },
            HeuristicStrategy::PatternBonus => pattern_bonus(text, profile.baseline_confidence),
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn markdown_vlm(text: &str) -> SubScores {
    let lower = text.to_lowercase();
    SubScores {
        structure: if contains_any(&lower, &["#", "##", "table", "---"]) { 0.9 } else { 0.7 },
        format: if contains_any(text, &["```", "*"]) { 0.9 } else { 0.6 },
    }
}

fn labeled_vlm(text: &str, metrics: &MetricSet) -> SubScores {
    SubScores {
        structure: if contains_any(text, &["Title:", "Heading:", "List:"]) { 0.8 } else { 0.6 },
        format: if metrics.line_count > 5 { 0.8 } else { 0.6 },
    }
}

fn high_accuracy_vlm(text: &str) -> SubScores {
    let lower = text.to_lowercase();
    SubScores {
        structure: if contains_any(&lower, &["#", "##", "table", "-"]) { 0.95 } else { 0.75 },
        format: if contains_any(text, &["```", "*", ">", "- "]) { 0.9 } else { 0.7 },
    }
}

fn pattern_bonus(text: &str, baseline: f64) -> SubScores {
    let structure = MetricExtractor::detect_structure(text).count() as f64;
    let format = MetricExtractor::detect_format(text).count() as f64;
    SubScores {
        structure: (baseline + structure * PATTERN_BONUS).min(1.0),
        format: (baseline + format * PATTERN_BONUS).min(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::profiles::BackendId;

    fn profile(baseline: f64) -> BackendProfile {
        let mut p = BackendProfile::fallback(BackendId::parse("custom"));
        p.baseline_confidence = baseline;
        p
    }

    fn apply(strategy: HeuristicStrategy, text: &str) -> SubScores {
        let metrics = MetricExtractor::extract(text);
        strategy.apply(text, &metrics, &profile(0.5))
    }

    #[test]
    fn test_markdown_vlm() {
        let rich = apply(HeuristicStrategy::MarkdownVlm, "# Title\nsome *bold*");
        assert_eq!(rich, SubScores { structure: 0.9, format: 0.9 });

        // "TABLE" matches case-insensitively
        let upper = apply(HeuristicStrategy::MarkdownVlm, "TABLE of contents");
        assert_eq!(upper.structure, 0.9);
        assert_eq!(upper.format, 0.6);

        let plain = apply(HeuristicStrategy::MarkdownVlm, "plain words");
        assert_eq!(plain, SubScores { structure: 0.7, format: 0.6 });
    }

    #[test]
    fn test_labeled_vlm() {
        let labeled = apply(HeuristicStrategy::LabeledVlm, "Title: Report\nbody");
        assert_eq!(labeled, SubScores { structure: 0.8, format: 0.6 });

        // labels are case-sensitive
        let lower = apply(HeuristicStrategy::LabeledVlm, "title: report");
        assert_eq!(lower.structure, 0.6);

        let long = apply(HeuristicStrategy::LabeledVlm, "1\n2\n3\n4\n5\n6");
        assert_eq!(long.format, 0.8);
        let five = apply(HeuristicStrategy::LabeledVlm, "1\n2\n3\n4\n5");
        assert_eq!(five.format, 0.6);
    }

    #[test]
    fn test_high_accuracy_vlm() {
        let rich = apply(HeuristicStrategy::HighAccuracyVlm, "> quoted - dash");
        assert_eq!(rich, SubScores { structure: 0.95, format: 0.9 });

        let plain = apply(HeuristicStrategy::HighAccuracyVlm, "plain words");
        assert_eq!(plain, SubScores { structure: 0.75, format: 0.7 });
    }

    #[test]
    fn test_fixed() {
        let fixed = HeuristicStrategy::Fixed { structure: 0.5, format: 0.4 };
        assert_eq!(apply(fixed, "# anything *at all*"), SubScores { structure: 0.5, format: 0.4 });
        assert_eq!(
            apply(HeuristicStrategy::fallback(), "x"),
            SubScores { structure: 0.5, format: 0.5 }
        );
    }

    #[test]
    fn test_pattern_bonus() {
        // header + list, paragraph break
        let scores = apply(HeuristicStrategy::PatternBonus, "# Title\n\n- a\n- b");
        assert!((scores.structure - 0.6).abs() < 1e-9);
        assert!((scores.format - 0.55).abs() < 1e-9);

        let plain = apply(HeuristicStrategy::PatternBonus, "plain words");
        assert_eq!(plain, SubScores { structure: 0.5, format: 0.5 });
    }

    #[test]
    fn test_pattern_bonus_capped() {
        let metrics = MetricExtractor::extract("x");
        let text = "# H\n- a\n| a | b |\n---\n\n  *x*";
        let scores = HeuristicStrategy::PatternBonus.apply(text, &metrics, &profile(0.95));
        assert_eq!(scores.structure, 1.0);
        assert_eq!(scores.format, 1.0);
    }

    #[test]
    fn test_strategy_serde_tagged() {
        let json = serde_json::json!({"type": "fixed", "structure": 0.3, "format": 0.2});
        let strategy: HeuristicStrategy = serde_json::from_value(json).unwrap();
        assert_eq!(strategy, HeuristicStrategy::Fixed { structure: 0.3, format: 0.2 });

        let bonus: HeuristicStrategy =
            serde_json::from_value(serde_json::json!({"type": "pattern_bonus"})).unwrap();
        assert_eq!(bonus, HeuristicStrategy::PatternBonus);
    }
}
