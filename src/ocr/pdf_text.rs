//! Basic PDF text-layer extraction using lopdf.

use std::io::Cursor;

use lopdf::Document;
use tracing::{debug, info};

use super::{join_pages, OcrError, OcrInput, OcrProvider, MAX_PAGES};
use crate::quality::BackendId;

pub struct PdfTextProvider;

impl PdfTextProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the text layer of the first [`MAX_PAGES`] pages.
fn extract_pdf_text(data: &[u8]) -> Result<String, OcrError> {
    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| OcrError::ExtractionFailed(format!("Failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    let total_pages = pages.len();

    let texts: Vec<String> = pages
        .keys()
        .take(MAX_PAGES)
        .map(|page_num| match doc.extract_text(&[*page_num]) {
            Ok(text) => text,
            Err(e) => {
                debug!("PdfTextProvider: no text on page {}: {}", page_num, e);
                String::new()
            }
        })
        .collect();

    Ok(join_pages(texts, total_pages))
}

#[async_trait::async_trait]
impl OcrProvider for PdfTextProvider {
    fn name(&self) -> &str {
        "pdf_text"
    }

    fn backend(&self) -> BackendId {
        BackendId::PdfText
    }

    async fn process(&self, input: &OcrInput) -> Result<String, OcrError> {
        if !input.is_pdf() {
            return Err(OcrError::UnsupportedInput(format!(
                "pdf_text only supports PDF files, got '{}'",
                input.filename
            )));
        }

        info!(
            "PdfTextProvider: extracting {} ({} bytes)",
            input.filename,
            input.data.len()
        );

        let data = input.data.clone();
        tokio::task::spawn_blocking(move || extract_pdf_text(&data))
            .await
            .map_err(|e| OcrError::ExtractionFailed(format!("PDF extraction task failed: {}", e)))?
    }
}
