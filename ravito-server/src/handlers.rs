//! HTTP handlers.
//!
//! Thin adapters over the engine: extract, delegate, serialize. Every
//! handler takes its session snapshot at entry, so uploads landing
//! mid-request never mix into a running calculation.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use ravito_bridge::{self as bridge, ChatAdapter, ChatContext, ChatRequest};
use ravito_engine::calculator::{self, CalculationRequest};
use ravito_engine::config::{ConfigStore, DepotConfiguration};
use ravito_engine::normalizer;
use ravito_engine::session::SessionStore;
use ravito_engine::topup;
use ravito_engine::types::{SessionKind, Summary};

use crate::error::ApiError;
use crate::export::{self, ExportItem};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub config: Arc<ConfigStore>,
    pub chat_adapter: Arc<dyn ChatAdapter>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub message: &'static str,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<UploadFilters>,
}

/// Dropdown values for the calculation screen, orders uploads only.
#[derive(Serialize)]
pub struct UploadFilters {
    pub depots: Vec<String>,
    pub articles: Vec<String>,
    pub packaging: Vec<String>,
}

pub async fn upload_orders(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    upload(state, multipart, SessionKind::Orders).await
}

pub async fn upload_stock(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    upload(state, multipart, SessionKind::Stock).await
}

pub async fn upload_transit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    upload(state, multipart, SessionKind::Transit).await
}

async fn upload(
    state: AppState,
    multipart: Multipart,
    kind: SessionKind,
) -> Result<Json<UploadResponse>, ApiError> {
    let (file_name, bytes) = read_file_part(multipart).await?;
    let (records, summary) = normalizer::normalize(kind, &bytes, &file_name)?;
    let session_id = state.sessions.put(records, &file_name, summary.clone());
    info!(
        kind = %kind,
        file = %file_name,
        records = summary.total_records,
        discarded = summary.discarded,
        "session published"
    );

    let filters = (kind == SessionKind::Orders).then(|| UploadFilters {
        depots: summary.depots.clone(),
        articles: summary.articles.clone(),
        packaging: summary.packagings.clone(),
    });
    Ok(Json(UploadResponse {
        session_id,
        message: "File uploaded successfully",
        summary,
        filters,
    }))
}

/// Pull the first file part out of a multipart body.
async fn read_file_part(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(ApiError::Upload("no file part in multipart body".into()))
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

pub async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<CalculationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.config.get();
    let result = calculator::calculate(&state.sessions, &config, &request)?;
    info!(
        days = request.days,
        rows = result.calculations.len(),
        depots = result.depot_summary.len(),
        "calculation served"
    );
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Depot suggestions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SuggestionRequest {
    pub depot_name: String,
    pub days: i64,
}

#[derive(Serialize)]
pub struct SuggestionResponse {
    pub depot_name: String,
    pub current_palettes: i64,
    pub target_palettes: i64,
    pub palettes_to_add: i64,
    pub slots_filled: i64,
    pub suggestions: Vec<ravito_engine::TopUpSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub async fn depot_suggestions(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    let config = state.config.get();
    let result = topup::suggest(&state.sessions, &config, &request.depot_name, request.days)?;
    Ok(Json(SuggestionResponse {
        depot_name: result.depot,
        current_palettes: result.current_pallets,
        target_palettes: result.target_pallets,
        palettes_to_add: result.target_pallets - result.current_pallets,
        slots_filled: result.slots_filled,
        suggestions: result.suggestions,
        note: result.note,
    }))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.list())
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub async fn get_configuration(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.config.get())
}

pub async fn set_configuration(
    State(state): State<AppState>,
    Json(config): Json<DepotConfiguration>,
) -> impl IntoResponse {
    info!(
        enabled = config.enabled,
        depots = config.mapping.len(),
        "configuration replaced"
    );
    state.config.set(config.clone());
    Json(config)
}

/// Depots and articles currently known to the engine, for the
/// configuration screen.
pub async fn available_options(State(state): State<AppState>) -> impl IntoResponse {
    let mut depots = Vec::new();
    let mut articles = Vec::new();
    if let Some(orders) = state.sessions.get_active(SessionKind::Orders) {
        depots.extend(orders.summary.depots.iter().cloned());
        articles.extend(orders.summary.articles.iter().cloned());
    }
    if let Some(stock) = state.sessions.get_active(SessionKind::Stock) {
        articles.extend(stock.summary.articles.iter().cloned());
    }
    depots.sort();
    depots.dedup();
    articles.sort();
    articles.dedup();
    Json(json!({ "depots": depots, "articles": articles }))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ExportRequest {
    pub selected_items: Vec<ExportItem>,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn export_excel(
    State(_state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.selected_items.is_empty() {
        return Err(ApiError::Engine(
            ravito_engine::EngineError::InvalidParameter {
                name: "selected_items",
                reason: "nothing selected for export".into(),
            },
        ));
    }
    let bytes = export::render(&request.selected_items)?;
    info!(
        items = request.selected_items.len(),
        session = ?request.session_id,
        "export rendered"
    );
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"plan-reappro.xlsx\"",
            ),
        ],
        bytes,
    ))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context = ChatContext::capture(&state.sessions);
    let response = bridge::chat(state.chat_adapter.as_ref(), context, request).await?;
    Ok(Json(response))
}
