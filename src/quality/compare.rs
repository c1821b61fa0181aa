//! Cross-backend comparison: ranking, best performer and review flags.

use serde::{Deserialize, Serialize};

use super::profiles::{BackendId, ProfileRegistry};
use super::QualityResult;

/// Backends scoring below this are flagged for review.
pub const REVIEW_THRESHOLD: f64 = 0.6;

/// Lower bound of the `good` display band.
pub const GOOD_THRESHOLD: f64 = 0.8;

/// Strength tags shown next to each ranked backend.
const STRENGTHS_SHOWN: usize = 2;

/// Display band for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= GOOD_THRESHOLD {
            ScoreBand::Good
        } else if score >= REVIEW_THRESHOLD {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBackend {
    pub rank: usize,
    pub backend: BackendId,
    pub composite_score: f64,
    pub band: ScoreBand,
    pub needs_review: bool,
    pub word_count: usize,
    pub line_count: usize,
    pub structure_score: f64,
    pub format_retention: f64,
    pub strengths: Vec<String>,
}

/// Derived view over a set of per-backend results. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub ranking: Vec<RankedBackend>,
    pub best_performer: Option<BackendId>,
    /// Score gap between first and second place.
    pub margin: Option<f64>,
    pub needs_review: Vec<BackendId>,
}

impl ComparisonReport {
    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }
}

/// Builds a [`ComparisonReport`] from per-backend results.
pub struct ComparisonAggregator<'a> {
    registry: &'a ProfileRegistry,
    review_threshold: f64,
}

impl<'a> ComparisonAggregator<'a> {
    pub fn new(registry: &'a ProfileRegistry) -> Self {
        Self {
            registry,
            review_threshold: REVIEW_THRESHOLD,
        }
    }

    pub fn with_review_threshold(mut self, threshold: f64) -> Self {
        self.review_threshold = threshold;
        self
    }

    /// Rank backends by composite score, highest first. Equal scores are
    /// ordered by backend id so the result is deterministic.
    pub fn aggregate<'r, I>(&self, results: I) -> ComparisonReport
    where
        I: IntoIterator<Item = (&'r BackendId, &'r QualityResult)>,
    {
        let mut entries: Vec<(&BackendId, &QualityResult)> = results.into_iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| {
            b.composite_score
                .total_cmp(&a.composite_score)
                .then_with(|| a_id.cmp(b_id))
        });

        let ranking: Vec<RankedBackend> = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (backend, result))| {
                let profile = self.registry.resolve(backend);
                RankedBackend {
                    rank: idx + 1,
                    backend: backend.clone(),
                    composite_score: result.composite_score,
                    band: ScoreBand::from_score(result.composite_score),
                    needs_review: result.composite_score < self.review_threshold,
                    word_count: result.metrics.word_count,
                    line_count: result.metrics.line_count,
                    structure_score: result.metrics.structure_score,
                    format_retention: result.metrics.format_retention,
                    strengths: profile.strengths.iter().take(STRENGTHS_SHOWN).cloned().collect(),
                }
            })
            .collect();

        let best_performer = ranking.first().map(|r| r.backend.clone());
        let margin = match ranking.as_slice() {
            [first, second, ..] => Some(first.composite_score - second.composite_score),
            _ => None,
        };
        let needs_review = ranking
            .iter()
            .filter(|r| r.needs_review)
            .map(|r| r.backend.clone())
            .collect();

        ComparisonReport {
            ranking,
            best_performer,
            margin,
            needs_review,
        }
    }
}
