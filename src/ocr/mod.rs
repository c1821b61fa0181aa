//! Backend dispatch: runs a document through one extraction backend and
//! hands the raw text to the scorer.
//!
//! Providers are thin wrappers around a local library or a remote API. They
//! report failures to the caller and never retry.

pub mod mistral;
pub mod pdf_text;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::quality::BackendId;

/// Multi-page documents are cut off after this many pages.
pub const MAX_PAGES: usize = 5;

/// Errors from extraction backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// An uploaded document.
#[derive(Debug, Clone)]
pub struct OcrInput {
    pub filename: String,
    pub data: Vec<u8>,
}

impl OcrInput {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.filename.to_lowercase().ends_with(".pdf")
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let lower = self.filename.to_lowercase();
        match lower.rsplit('.').next() {
            Some("pdf") => "application/pdf",
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("bmp") => "image/bmp",
            Some("tif") | Some("tiff") => "image/tiff",
            _ => "application/octet-stream",
        }
    }
}

/// Async trait implemented by each extraction backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;
    fn backend(&self) -> BackendId;
    async fn process(&self, input: &OcrInput) -> Result<String, OcrError>;
}

/// Join per-page texts, appending a note when pages were dropped.
pub fn join_pages(pages: Vec<String>, total_pages: usize) -> String {
    let mut parts = pages;
    if total_pages > MAX_PAGES {
        parts.push(format!(
            "\n\n---\n\n*Note: Document truncated to first {} pages.*",
            MAX_PAGES
        ));
    }
    parts.join("\n\n")
}

/// Providers available in this process.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn OcrProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local PDF text extraction always, Mistral when `MISTRAL_API_KEY` is set.
    pub fn from_env(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(pdf_text::PdfTextProvider::new()));
        match mistral::MistralOcrProvider::from_env(client) {
            Ok(provider) => registry.register(Arc::new(provider)),
            Err(e) => info!("Mistral OCR provider disabled: {}", e),
        }
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn OcrProvider>) {
        info!("Registered extraction provider: {}", provider.name());
        self.providers.push(provider);
    }

    pub fn get(&self, backend: &BackendId) -> Option<Arc<dyn OcrProvider>> {
        self.providers
            .iter()
            .find(|p| &p.backend() == backend)
            .cloned()
    }

    pub fn backends(&self) -> Vec<BackendId> {
        self.providers.iter().map(|p| p.backend()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait::async_trait]
    impl OcrProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn backend(&self) -> BackendId {
            BackendId::Tesseract
        }

        async fn process(&self, input: &OcrInput) -> Result<String, OcrError> {
            Ok(String::from_utf8_lossy(&input.data).to_string())
        }
    }

    #[test]
    fn test_join_pages_without_truncation() {
        let text = join_pages(vec!["one".to_string(), "two".to_string()], 2);
        assert_eq!(text, "one\n\ntwo");
    }

    #[test]
    fn test_join_pages_with_truncation_note() {
        let pages: Vec<String> = (1..=MAX_PAGES).map(|i| format!("page {}", i)).collect();
        let text = join_pages(pages, 9);
        assert!(text.starts_with("page 1\n\npage 2"));
        assert!(text.ends_with("*Note: Document truncated to first 5 pages.*"));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(OcrInput::new("a.PDF", vec![]).mime_type(), "application/pdf");
        assert_eq!(OcrInput::new("scan.jpeg", vec![]).mime_type(), "image/jpeg");
        assert_eq!(OcrInput::new("noext", vec![]).mime_type(), "application/octet-stream");
        assert!(OcrInput::new("Report.Pdf", vec![]).is_pdf());
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(EchoProvider));

        assert!(registry.get(&BackendId::Mistral).is_none());
        let provider = registry.get(&BackendId::Tesseract).unwrap();
        let text = provider
            .process(&OcrInput::new("a.txt", b"hello".to_vec()))
            .await
            .unwrap();
        assert_eq!(text, "hello");
        assert_eq!(registry.backends(), vec![BackendId::Tesseract]);
    }
}
