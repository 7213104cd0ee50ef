//! Axum HTTP layer.
//!
//! `serve()` drives the server loop; the shared [`CancellationToken`] is
//! wired to axum's graceful shutdown. Handlers live in [`api`].
//!
//! ## URL layout
//!
//! ```text
//! POST /analysis/analyze
//! GET  /analysis/search
//! GET  /health
//! GET  /
//! GET  /favicon.ico   → 204
//! ```

pub mod api;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::AppError;
use crate::llm::LlmProvider;
use crate::nlp::KeywordExtractor;
use crate::storage::AnalysisStore;

/// Name and version reported by the info endpoints.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub version: &'static str,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), version: env!("CARGO_PKG_VERSION") }
    }
}

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted or copy.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceInfo>,
    pub llm: LlmProvider,
    pub extractor: Arc<KeywordExtractor>,
    pub store: AnalysisStore,
    /// How many keywords to keep per analysis.
    pub top_keywords: usize,
}

/// Bind, serve and shut down gracefully when `shutdown` is cancelled.
pub async fn serve(
    bind_addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Http(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Http(format!("server error: {e}")))?;

    info!("http server shut down");
    Ok(())
}

/// Assemble the router. Public so integration tests can drive it with
/// `tower::util::oneshot` without binding a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/analysis/analyze", post(api::analyze))
        .route("/analysis/search", get(api::search))
        .route("/health", get(api::health))
        .route("/", get(api::home))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
