//! Scoring and server configuration.
//!
//! Scoring constants can be overridden from a JSON file named by
//! `SCORING_CONFIG`; without it the built-in defaults apply.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::quality::compare::REVIEW_THRESHOLD;
use crate::quality::{
    BackendId, BackendProfile, HeuristicStrategy, ProfileRegistry, QualityScorer, ScoringWeights,
};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Overridable scoring constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub review_threshold: f64,
    /// Baseline confidence overrides keyed by backend name.
    pub baselines: BTreeMap<String, f64>,
    /// Backends beyond the built-in table.
    pub custom_backends: Vec<CustomBackend>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            review_threshold: REVIEW_THRESHOLD,
            baselines: BTreeMap::new(),
            custom_backends: Vec::new(),
        }
    }
}

/// A backend profile declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomBackend {
    pub id: String,
    pub baseline_confidence: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub ideal_for: Vec<String>,
    #[serde(default = "HeuristicStrategy::fallback")]
    pub strategy: HeuristicStrategy,
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        anyhow::bail!("{} must be within [0, 1], got {}", name, value);
    }
    Ok(())
}

impl ScoringConfig {
    /// Load from `SCORING_CONFIG` if set, otherwise defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var("SCORING_CONFIG") {
            Ok(path) => Self::load(Path::new(&path)),
            Err(_) => {
                info!("SCORING_CONFIG not set, using built-in scoring defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring config: {:?}", path))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("Invalid scoring config: {:?}", path))?;
        info!(
            "Loaded scoring config from {:?} ({} baseline overrides, {} custom backends)",
            path,
            config.baselines.len(),
            config.custom_backends.len()
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: ScoringConfig =
            serde_json::from_str(content).context("Failed to parse scoring config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        check_unit("weights.confidence", w.confidence)?;
        check_unit("weights.structure", w.structure)?;
        check_unit("weights.format", w.format)?;
        if (w.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            anyhow::bail!("weights must sum to 1.0, got {}", w.sum());
        }
        check_unit("review_threshold", self.review_threshold)?;
        for (backend, baseline) in &self.baselines {
            check_unit(&format!("baselines.{}", backend), *baseline)?;
        }
        for custom in &self.custom_backends {
            if custom.id.trim().is_empty() {
                anyhow::bail!("custom backend id must not be empty");
            }
            check_unit(&format!("{}.baseline_confidence", custom.id), custom.baseline_confidence)?;
            if let HeuristicStrategy::Fixed { structure, format } = custom.strategy {
                check_unit(&format!("{}.strategy.structure", custom.id), structure)?;
                check_unit(&format!("{}.strategy.format", custom.id), format)?;
            }
        }
        Ok(())
    }

    /// Built-in profiles with custom backends and baseline overrides applied.
    pub fn registry(&self) -> ProfileRegistry {
        let mut registry = ProfileRegistry::builtin();
        for custom in &self.custom_backends {
            registry.register(BackendProfile {
                backend: BackendId::parse(&custom.id),
                baseline_confidence: custom.baseline_confidence,
                strengths: custom.strengths.clone(),
                ideal_for: custom.ideal_for.clone(),
                strategy: custom.strategy,
            });
        }
        for (backend, baseline) in &self.baselines {
            registry.set_baseline(&BackendId::parse(backend), *baseline);
        }
        registry
    }

    pub fn scorer(&self) -> QualityScorer {
        QualityScorer::new(self.weights, self.registry())
    }
}

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_json_is_default() {
        let config = ScoringConfig::from_json("{}").unwrap();
        assert_eq!(config.weights, ScoringWeights::default());
        assert_eq!(config.review_threshold, REVIEW_THRESHOLD);
        assert!(config.baselines.is_empty());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = ScoringConfig::from_json(
            r#"{"weights": {"confidence": 0.5, "structure": 0.3, "format": 0.3}}"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("sum to 1.0"));

        let ok = ScoringConfig::from_json(
            r#"{"weights": {"confidence": 0.5, "structure": 0.25, "format": 0.25}}"#,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_baseline_out_of_range_rejected() {
        let err = ScoringConfig::from_json(r#"{"baselines": {"google": 1.2}}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("baselines.google"));
    }

    #[test]
    fn test_registry_applies_overrides() {
        let config = ScoringConfig::from_json(
            r#"{
                "baselines": {"Tesseract": 0.7},
                "custom_backends": [
                    {"id": "Azure", "baseline_confidence": 0.82, "strengths": ["Forms"],
                     "strategy": {"type": "pattern_bonus"}},
                    {"id": "easyocr", "baseline_confidence": 0.55}
                ]
            }"#,
        )
        .unwrap();
        let registry = config.registry();

        assert_eq!(registry.resolve(&BackendId::Tesseract).baseline_confidence, 0.7);
        let azure = registry.get(&BackendId::parse("azure")).unwrap();
        assert_eq!(azure.strategy, HeuristicStrategy::PatternBonus);
        assert_eq!(azure.strengths, vec!["Forms".to_string()]);
        let easy = registry.get(&BackendId::parse("easyocr")).unwrap();
        assert_eq!(easy.strategy, HeuristicStrategy::fallback());
    }

    #[test]
    fn test_custom_backend_scores_with_pattern_bonus() {
        let config = ScoringConfig::from_json(
            r#"{"custom_backends": [{"id": "azure", "baseline_confidence": 0.8,
                "strategy": {"type": "pattern_bonus"}}]}"#,
        )
        .unwrap();
        let scorer = config.scorer();
        let result = scorer.evaluate("# Title\n\n- a\n- b", &BackendId::parse("azure"), None);
        assert!((result.metrics.structure_score - 0.9).abs() < 1e-9);
        assert!((result.metrics.format_retention - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("scoring-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"review_threshold": 0.5}}"#).unwrap();
        drop(file);

        let config = ScoringConfig::load(&path).unwrap();
        assert_eq!(config.review_threshold, 0.5);
        std::fs::remove_file(&path).unwrap();

        assert!(ScoringConfig::load(&path).is_err());
    }
}
