//! Mistral OCR provider (uses Mistral's OCR API).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{join_pages, OcrError, OcrInput, OcrProvider, MAX_PAGES};
use crate::quality::BackendId;

const MISTRAL_API_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_MODEL: &str = "mistral-ocr-latest";

pub struct MistralOcrProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl MistralOcrProvider {
    pub fn from_env(client: reqwest::Client) -> Result<Self, OcrError> {
        let api_key = std::env::var("MISTRAL_API_KEY")
            .map_err(|_| OcrError::BackendNotAvailable("MISTRAL_API_KEY not set".to_string()))?;
        let model = std::env::var("MISTRAL_OCR_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self {
            api_key,
            model,
            client,
        })
    }
}

// ── Mistral API request/response types ──────────────────────────────────────

#[derive(Serialize)]
struct OcrRequest {
    model: String,
    document: DocumentSource,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum DocumentSource {
    #[serde(rename = "image_url")]
    Image { image_url: String },
    #[serde(rename = "file")]
    File { file_id: String },
}

#[derive(Deserialize)]
struct OcrResponse {
    pages: Vec<MistralPage>,
}

#[derive(Deserialize)]
struct MistralPage {
    index: u32,
    markdown: String,
}

#[derive(Deserialize)]
struct FileUploadResponse {
    id: String,
}

async fn error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    format!("({}): {}", status, text)
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl OcrProvider for MistralOcrProvider {
    fn name(&self) -> &str {
        "mistral_ocr"
    }

    fn backend(&self) -> BackendId {
        BackendId::Mistral
    }

    async fn process(&self, input: &OcrInput) -> Result<String, OcrError> {
        let document = if input.is_pdf() {
            let file_id = self.upload_file(input).await?;
            DocumentSource::File { file_id }
        } else {
            DocumentSource::Image {
                image_url: format!(
                    "data:{};base64,{}",
                    input.mime_type(),
                    BASE64.encode(&input.data)
                ),
            }
        };

        let body = OcrRequest {
            model: self.model.clone(),
            document,
        };

        info!("MistralOcrProvider: calling OCR API for {}", input.filename);

        let resp = self
            .client
            .post(format!("{}/ocr", MISTRAL_API_URL))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(OcrError::ExtractionFailed(format!(
                "Mistral OCR API error {}",
                error_body(resp).await
            )));
        }

        let raw_text = resp.text().await?;
        debug!(
            "MistralOcrProvider: raw response ({} bytes): {}",
            raw_text.len(),
            raw_text.chars().take(500).collect::<String>()
        );
        let mut ocr: OcrResponse = serde_json::from_str(&raw_text).map_err(|e| {
            OcrError::ExtractionFailed(format!("Unexpected Mistral OCR response: {}", e))
        })?;

        ocr.pages.sort_by_key(|p| p.index);
        let total_pages = ocr.pages.len();
        let pages: Vec<String> = ocr
            .pages
            .into_iter()
            .take(MAX_PAGES)
            .map(|p| p.markdown)
            .collect();

        Ok(join_pages(pages, total_pages))
    }
}

impl MistralOcrProvider {
    /// Upload raw bytes to Mistral Files API, return the file_id.
    async fn upload_file(&self, input: &OcrInput) -> Result<String, OcrError> {
        use reqwest::multipart::{Form, Part};

        info!(
            "MistralOcrProvider: uploading {} ({} bytes) to Files API",
            input.filename,
            input.data.len()
        );

        let part = Part::bytes(input.data.clone())
            .file_name(input.filename.clone())
            .mime_str(input.mime_type())?;

        let form = Form::new().part("file", part).text("purpose", "ocr");

        let resp = self
            .client
            .post(format!("{}/files", MISTRAL_API_URL))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(OcrError::ExtractionFailed(format!(
                "Mistral Files API error {}",
                error_body(resp).await
            )));
        }

        let upload: FileUploadResponse = resp.json().await?;
        info!("MistralOcrProvider: uploaded file_id={}", upload.id);
        Ok(upload.id)
    }
}
