//! HTTP entry point.
//!
//! Wires the engine's stores and the chat adapter into an axum router.
//! All state lives in memory; restarting the process starts from a clean
//! slate.

mod error;
mod export;
mod handlers;

use std::env;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ravito_bridge::OfflineAdapter;
use ravito_engine::config::ConfigStore;
use ravito_engine::session::SessionStore;

use crate::handlers::AppState;

/// Uploads are whole spreadsheets; the axum default of 2 MiB is too tight.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/upload-commandes-excel", post(handlers::upload_orders))
        .route("/api/upload-stock-excel", post(handlers::upload_stock))
        .route("/api/upload-transit-excel", post(handlers::upload_transit))
        .route("/api/calculate", post(handlers::calculate))
        .route("/api/depot-suggestions", post(handlers::depot_suggestions))
        .route("/api/export-excel", post(handlers::export_excel))
        .route("/api/sessions", get(handlers::list_sessions))
        .route(
            "/api/configuration",
            get(handlers::get_configuration).post(handlers::set_configuration),
        )
        .route("/api/available-options", get(handlers::available_options))
        .route("/api/chat", post(handlers::chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let state = AppState {
        sessions: Arc::new(SessionStore::new()),
        config: Arc::new(ConfigStore::new()),
        chat_adapter: Arc::new(OfflineAdapter),
    };

    let host = env::var("BACKEND_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port = env::var("BACKEND_PORT").unwrap_or_else(|_| "8001".into());
    let addr = format!("{host}:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!(%addr, "ravito server listening");

    if let Err(e) = axum::serve(listener, router(state)).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
