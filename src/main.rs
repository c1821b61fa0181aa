//! OCR Compare - scores and ranks text extraction backends run on the same document.

mod config;
mod ocr;
mod quality;
mod session;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use config::{ScoringConfig, ServerConfig};
use ocr::{OcrInput, ProviderRegistry};
use quality::{
    BackendId, BackendProfile, ComparisonAggregator, ComparisonReport, EvaluationMetadata,
    QualityResult, QualityScorer,
};
use session::{BackendRun, ComparisonSession, DocumentInfo, SessionStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    scorer: Arc<QualityScorer>,
    sessions: SessionStore,
    providers: Arc<ProviderRegistry>,
    review_threshold: f64,
}

impl AppState {
    fn new(config: &ScoringConfig, providers: ProviderRegistry) -> Self {
        Self {
            scorer: Arc::new(config.scorer()),
            sessions: SessionStore::new(),
            providers: Arc::new(providers),
            review_threshold: config.review_threshold,
        }
    }

    fn aggregator(&self) -> ComparisonAggregator<'_> {
        ComparisonAggregator::new(self.scorer.registry()).with_review_threshold(self.review_threshold)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_compare=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let scoring = ScoringConfig::from_env()?;
    let server = ServerConfig::from_env();
    info!(
        "Scoring weights: confidence={} structure={} format={}, review threshold {}",
        scoring.weights.confidence,
        scoring.weights.structure,
        scoring.weights.format,
        scoring.review_threshold
    );

    let providers = ProviderRegistry::from_env(reqwest::Client::new());
    info!("Extraction providers: {}", backend_list(&providers));

    let state = AppState::new(&scoring, providers);
    info!("Loaded {} backend profiles", state.scorer.registry().len());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;
    info!("Server listening on http://{}", server.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Comma-separated wire ids of the registered providers.
fn backend_list(providers: &ProviderRegistry) -> String {
    providers
        .backends()
        .iter()
        .map(BackendId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/backends", get(list_backends))
        .route("/evaluate", post(evaluate))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/results", post(record_result))
        .route("/sessions/:id/extract", post(extract_document))
        .route("/sessions/:id/report", get(get_report))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // 50MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List every known backend profile.
async fn list_backends(State(state): State<AppState>) -> Json<Vec<BackendProfile>> {
    Json(state.scorer.registry().profiles().cloned().collect())
}

/// Text produced elsewhere, submitted for scoring.
#[derive(serde::Deserialize)]
struct EvaluateRequest {
    /// Usually a string; anything else scores as zero.
    #[serde(default)]
    text: serde_json::Value,
    backend: String,
    #[serde(default)]
    metadata: Option<EvaluationMetadata>,
    #[serde(default)]
    document: Option<DocumentInfo>,
}

/// Score text without storing anything.
async fn evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Json<QualityResult> {
    let backend = BackendId::parse(&req.backend);
    Json(state.scorer.evaluate_value(&req.text, &backend, req.metadata.as_ref()))
}

/// Start a new comparison session.
async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<ComparisonSession>) {
    let session = state.sessions.create();
    info!("Created session {} ({} active)", session.id, state.sessions.len());
    (StatusCode::CREATED, Json(session))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ComparisonSession>, StatusCode> {
    state.sessions.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.remove(&id) {
        info!("Removed session {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Score text from an external backend run and record it in the session.
async fn record_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<BackendRun>, (StatusCode, String)> {
    let backend = BackendId::parse(&req.backend);
    let result = state.scorer.evaluate_value(&req.text, &backend, req.metadata.as_ref());
    let text = req.text.as_str().unwrap_or_default().to_string();
    let run = BackendRun::new(text, result, req.document);

    state
        .sessions
        .record(&id, backend.clone(), run.clone())
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown session: {}", id)))?;

    info!(
        "Session {}: recorded {} (score {:.3})",
        id, backend, run.result.composite_score
    );
    Ok(Json(run))
}

#[derive(serde::Deserialize)]
struct ExtractQuery {
    backend: String,
    language: Option<String>,
}

/// Upload a document, run it through one backend, score and record the output.
async fn extract_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExtractQuery>,
    mut multipart: Multipart,
) -> Result<Json<BackendRun>, (StatusCode, String)> {
    if state.sessions.get(&id).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("Unknown session: {}", id)));
    }

    let backend = BackendId::parse(&query.backend);
    let provider = state.providers.get(&backend).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!(
                "No provider for backend: {}. Available: {}",
                backend,
                backend_list(&state.providers)
            ),
        )
    })?;

    // Read the uploaded file
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("document").to_string();
            file_data = field.bytes().await.map_err(|e| {
                (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
            })?.to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!(
        "Session {}: running {} on {} ({} bytes)",
        id,
        provider.name(),
        filename,
        file_data.len()
    );

    let document = DocumentInfo::from_bytes(&filename, &file_data);
    let text = provider
        .process(&OcrInput::new(filename, file_data))
        .await
        .map_err(|e| {
            error!("{} failed: {}", provider.name(), e);
            (StatusCode::BAD_GATEWAY, format!("{} failed: {}", provider.name(), e))
        })?;

    if text.trim().is_empty() {
        warn!("{} returned no text for {}", provider.name(), document.name);
    }

    let metadata = query.language.map(EvaluationMetadata::with_language);
    let result = state.scorer.evaluate(&text, &backend, metadata.as_ref());
    let run = BackendRun::new(text, result, Some(document));

    state
        .sessions
        .record(&id, backend, run.clone())
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown session: {}", id)))?;

    Ok(Json(run))
}

/// Rank every backend recorded in the session.
async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ComparisonReport>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let report = session.report(&state.aggregator());
    if report.is_empty() {
        debug!("Session {}: report requested before any results", id);
    }
    Ok(Json(report))
}
