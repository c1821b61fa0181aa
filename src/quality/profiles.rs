//! Backend identifiers and the read-only profile registry.
//!
//! Baseline confidences are calibrated design constants, not measurements:
//! a PDF text layer has no recognition error, a local recognizer has plenty,
//! and the cloud vision-language backends sit in between.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::heuristics::HeuristicStrategy;

/// Per-backend baseline confidences.
pub mod baseline {
    pub const MISTRAL: f64 = 0.85;
    pub const GOOGLE: f64 = 0.80;
    pub const NVIDIA: f64 = 0.90;
    pub const TESSERACT: f64 = 0.60;
    pub const MUPDF: f64 = 0.95;
    pub const PDF_TEXT: f64 = 0.70;
    /// Used for any backend without a profile.
    pub const FALLBACK: f64 = 0.5;
}

/// Identifies which extraction backend produced a piece of text.
///
/// Unknown names are kept as [`BackendId::Custom`] rather than rejected.
/// Ordering is lexical on [`BackendId::as_str`], which is what ranking uses
/// to break ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum BackendId {
    /// Mistral OCR: markdown-aware cloud VLM.
    Mistral,
    /// Google Gemini vision.
    Google,
    /// NVIDIA hosted OCR model with markdown output.
    Nvidia,
    /// Tesseract, local constrained recognizer.
    Tesseract,
    /// MuPDF text layer extraction.
    MuPdf,
    /// Basic PDF text layer extraction.
    PdfText,
    Custom(String),
}

impl BackendId {
    pub const BUILTIN: [BackendId; 6] = [
        BackendId::Mistral,
        BackendId::Google,
        BackendId::Nvidia,
        BackendId::Tesseract,
        BackendId::MuPdf,
        BackendId::PdfText,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            BackendId::Mistral => "mistral",
            BackendId::Google => "google",
            BackendId::Nvidia => "nvidia",
            BackendId::Tesseract => "tesseract",
            BackendId::MuPdf => "mupdf",
            BackendId::PdfText => "pdf_text",
            BackendId::Custom(name) => name,
        }
    }

    /// Parse a backend name, case-insensitively. Never fails.
    pub fn parse(s: &str) -> Self {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "mistral" | "mistral_ocr" => BackendId::Mistral,
            "google" | "gemini" => BackendId::Google,
            "nvidia" | "nemo" => BackendId::Nvidia,
            "tesseract" => BackendId::Tesseract,
            "mupdf" | "pymupdf" | "fitz" => BackendId::MuPdf,
            "pdf_text" | "pypdf2" | "pypdf" | "lopdf" => BackendId::PdfText,
            _ => BackendId::Custom(name),
        }
    }

    fn variant_index(&self) -> u8 {
        match self {
            BackendId::Mistral => 0,
            BackendId::Google => 1,
            BackendId::Nvidia => 2,
            BackendId::Tesseract => 3,
            BackendId::MuPdf => 4,
            BackendId::PdfText => 5,
            BackendId::Custom(_) => 6,
        }
    }
}

impl Ord for BackendId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str()
            .cmp(other.as_str())
            .then_with(|| self.variant_index().cmp(&other.variant_index()))
    }
}

impl PartialOrd for BackendId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for BackendId {
    fn from(s: String) -> Self {
        BackendId::parse(&s)
    }
}

impl From<BackendId> for String {
    fn from(id: BackendId) -> Self {
        id.as_str().to_string()
    }
}

/// Immutable description of a backend.
///
/// `strengths` and `ideal_for` are display-only; scoring reads
/// `baseline_confidence` and `strategy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendProfile {
    pub backend: BackendId,
    pub baseline_confidence: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub ideal_for: Vec<String>,
    pub strategy: HeuristicStrategy,
}

impl BackendProfile {
    fn builtin(
        backend: BackendId,
        baseline_confidence: f64,
        strengths: [&str; 3],
        ideal_for: [&str; 3],
        strategy: HeuristicStrategy,
    ) -> Self {
        Self {
            backend,
            baseline_confidence,
            strengths: strengths.iter().map(|s| s.to_string()).collect(),
            ideal_for: ideal_for.iter().map(|s| s.to_string()).collect(),
            strategy,
        }
    }

    /// Neutral profile for backends nobody described.
    pub fn fallback(backend: BackendId) -> Self {
        Self {
            backend,
            baseline_confidence: baseline::FALLBACK,
            strengths: Vec::new(),
            ideal_for: Vec::new(),
            strategy: HeuristicStrategy::fallback(),
        }
    }
}

/// Lookup table from [`BackendId`] to [`BackendProfile`].
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<BackendId, BackendProfile>,
    fallback: BackendProfile,
}

impl ProfileRegistry {
    /// The built-in backend table.
    pub fn builtin() -> Self {
        let profiles = [
            BackendProfile::builtin(
                BackendId::Mistral,
                baseline::MISTRAL,
                ["Structure preservation", "Layout understanding", "Image extraction"],
                ["Complex documents", "Tables", "Mixed layouts"],
                HeuristicStrategy::MarkdownVlm,
            ),
            BackendProfile::builtin(
                BackendId::Google,
                baseline::GOOGLE,
                ["Visual understanding", "Multiple languages", "Context awareness"],
                ["Images", "Handwriting", "Screenshots"],
                HeuristicStrategy::LabeledVlm,
            ),
            BackendProfile::builtin(
                BackendId::Nvidia,
                baseline::NVIDIA,
                ["Markdown output", "Table recognition", "Dense layouts"],
                ["Scanned reports", "Forms", "Technical documents"],
                HeuristicStrategy::HighAccuracyVlm,
            ),
            BackendProfile::builtin(
                BackendId::Tesseract,
                baseline::TESSERACT,
                ["Speed", "Offline processing", "Language support"],
                ["Simple documents", "Clear text", "Basic layouts"],
                HeuristicStrategy::Fixed { structure: 0.5, format: 0.4 },
            ),
            BackendProfile::builtin(
                BackendId::MuPdf,
                baseline::MUPDF,
                ["Fast processing", "Layout preservation", "PDF handling"],
                ["Clean PDFs", "Digital documents", "Text extraction"],
                HeuristicStrategy::Fixed { structure: 0.8, format: 0.7 },
            ),
            BackendProfile::builtin(
                BackendId::PdfText,
                baseline::PDF_TEXT,
                ["Simple processing", "Memory efficient", "Basic extraction"],
                ["Basic PDFs", "Text extraction", "Simple documents"],
                HeuristicStrategy::Fixed { structure: 0.6, format: 0.5 },
            ),
        ];

        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.backend.clone(), p))
                .collect(),
            fallback: BackendProfile::fallback(BackendId::Custom("unknown".to_string())),
        }
    }

    /// Add or replace a profile.
    pub fn register(&mut self, profile: BackendProfile) {
        self.profiles.insert(profile.backend.clone(), profile);
    }

    /// Override one backend's baseline confidence. Unknown backends get a
    /// fallback profile carrying the new baseline.
    pub fn set_baseline(&mut self, backend: &BackendId, baseline_confidence: f64) {
        self.profiles
            .entry(backend.clone())
            .or_insert_with(|| BackendProfile::fallback(backend.clone()))
            .baseline_confidence = baseline_confidence;
    }

    pub fn get(&self, backend: &BackendId) -> Option<&BackendProfile> {
        self.profiles.get(backend)
    }

    /// Profile for `backend`, or the neutral fallback.
    pub fn resolve(&self, backend: &BackendId) -> &BackendProfile {
        match self.get(backend) {
            Some(profile) => profile,
            None => {
                debug!("No profile for backend '{}', using fallback", backend);
                &self.fallback
            }
        }
    }

    /// All registered profiles, ordered by backend id.
    pub fn profiles(&self) -> impl Iterator<Item = &BackendProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
