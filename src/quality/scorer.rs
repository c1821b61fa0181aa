//! Composite quality scoring.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::metrics::MetricExtractor;
use super::profiles::{BackendId, ProfileRegistry};
use super::{clamp_unit, MetricSet, QualityResult};

pub const DEFAULT_CONFIDENCE_WEIGHT: f64 = 0.4;
pub const DEFAULT_STRUCTURE_WEIGHT: f64 = 0.3;
pub const DEFAULT_FORMAT_WEIGHT: f64 = 0.3;

/// Multiplier applied to confidence when the expected language token is missing.
pub const LANGUAGE_MISMATCH_PENALTY: f64 = 0.8;

/// Weights of the three sub-scores in the composite. Expected to sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub confidence: f64,
    pub structure: f64,
    pub format: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE_WEIGHT,
            structure: DEFAULT_STRUCTURE_WEIGHT,
            format: DEFAULT_FORMAT_WEIGHT,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.confidence + self.structure + self.format
    }

    /// Weighted sum of the sub-scores, clamped to `[0, 1]`.
    pub fn composite(&self, metrics: &MetricSet) -> f64 {
        clamp_unit(
            metrics.confidence_score * self.confidence
                + metrics.structure_score * self.structure
                + metrics.format_retention * self.format,
        )
    }
}

/// Optional hints supplied by whoever ran the backend.
///
/// Only `language` is recognised; any other key is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetadata {
    #[serde(default)]
    pub language: Option<String>,
}

impl EvaluationMetadata {
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
        }
    }

    fn expected_language(&self) -> Option<&str> {
        self.language.as_deref().filter(|l| !l.trim().is_empty())
    }
}

/// Turns `(text, backend, metadata)` into a [`QualityResult`].
///
/// Total: every input produces a result, nothing here returns an error.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    weights: ScoringWeights,
    registry: ProfileRegistry,
}

impl QualityScorer {
    pub fn new(weights: ScoringWeights, registry: ProfileRegistry) -> Self {
        Self { weights, registry }
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Score one backend's extracted text.
    pub fn evaluate(
        &self,
        text: &str,
        backend: &BackendId,
        metadata: Option<&EvaluationMetadata>,
    ) -> QualityResult {
        if text.trim().is_empty() {
            debug!("Blank text from '{}', returning zero result", backend);
            return QualityResult::zero();
        }

        let profile = self.registry.resolve(backend);
        let mut metrics = MetricExtractor::extract(text);
        metrics.confidence_score = profile.baseline_confidence;

        if let Some(language) = metadata.and_then(|m| m.expected_language()) {
            if !text.to_lowercase().contains(&language.to_lowercase()) {
                debug!(
                    "Expected language '{}' not found in '{}' output, penalizing confidence",
                    language, backend
                );
                metrics.confidence_score *= LANGUAGE_MISMATCH_PENALTY;
            }
        }

        let sub = profile.strategy.apply(text, &metrics, profile);
        metrics.structure_score = sub.structure;
        metrics.format_retention = sub.format;

        metrics.confidence_score = clamp_unit(metrics.confidence_score);
        metrics.structure_score = clamp_unit(metrics.structure_score);
        metrics.format_retention = clamp_unit(metrics.format_retention);

        let composite_score = self.weights.composite(&metrics);

        debug!(
            "Scored '{}': composite={:.3} (conf={:.2}, struct={:.2}, format={:.2}, {} words)",
            backend,
            composite_score,
            metrics.confidence_score,
            metrics.structure_score,
            metrics.format_retention,
            metrics.word_count
        );

        QualityResult {
            composite_score,
            metrics,
        }
    }

    /// Score text arriving as loosely-typed JSON. Anything other than a
    /// string scores as the zero result.
    pub fn evaluate_value(
        &self,
        text: &serde_json::Value,
        backend: &BackendId,
        metadata: Option<&EvaluationMetadata>,
    ) -> QualityResult {
        match text.as_str() {
            Some(text) => self.evaluate(text, backend, metadata),
            None => {
                debug!("Non-string text from '{}', returning zero result", backend);
                QualityResult::zero()
            }
        }
    }
}
