//! Handlers for all routes.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Validation runs before any call to the LLM
//! provider or the database; errors are mapped to a status + JSON body at
//! this edge and nowhere else.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::AppState;
use crate::llm::Sentiment;
use crate::storage::{NewAnalysis, SearchFilter, SearchPage};

/// Hard cap on input size, in characters.
const MAX_TEXT_CHARS: usize = 10_000;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    keyword: Option<String>,
    sentiment: Option<Sentiment>,
    limit: Option<u32>,
    offset: Option<u32>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /analysis/analyze
///
/// Validate → LLM analysis (summary ∥ metadata) → local keyword extraction →
/// insert → 201 with the stored row.
pub(super) async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            json_error("empty_text", "text must not be empty"),
        )
            .into_response();
    }
    if req.text.chars().count() > MAX_TEXT_CHARS {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            json_error(
                "text_too_long",
                format!("text exceeds {MAX_TEXT_CHARS} characters"),
            ),
        )
            .into_response();
    }

    let llm = match state.llm.analyze(&req.text).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "llm analysis failed");
            return (
                StatusCode::BAD_GATEWAY,
                json_error("llm_unavailable", "failed to analyze text"),
            )
                .into_response();
        }
    };

    let keywords: BTreeMap<String, usize> = state
        .extractor
        .keyword_frequency(&req.text, state.top_keywords)
        .into_iter()
        .collect();
    let stats = state.extractor.stats(&req.text);

    let metadata = json!({
        "title": llm.metadata.title,
        "topics": llm.metadata.topics,
        "word_count": stats.word_count,
        "sentence_count": stats.sentence_count,
    });

    let new = NewAnalysis {
        text: req.text,
        summary: llm.summary,
        sentiment: llm.metadata.sentiment,
        keywords: json!(keywords),
        metadata,
    };

    match state.store.insert(new).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to store analysis");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_error("database_error", "failed to store analysis"),
            )
                .into_response()
        }
    }
}

/// GET /analysis/search
///
/// Filters are conjunctive; `limit`/`offset` page the newest-first result
/// set. `total` counts all rows matching the filter.
pub(super) async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            json_error("invalid_limit", format!("limit must be between 1 and {MAX_LIMIT}")),
        )
            .into_response();
    }
    let offset = params.offset.unwrap_or(0);

    let filter = SearchFilter {
        keyword: params.keyword.filter(|k| !k.trim().is_empty()),
        sentiment: params.sentiment,
        limit: i64::from(limit),
        offset: i64::from(offset),
    };

    match state.store.search(&filter).await {
        Ok(SearchPage { results, total }) => Json(json!({
            "results": results,
            "total": total,
            "limit": limit,
            "offset": offset,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_error("database_error", "failed to search analyses"),
            )
                .into_response()
        }
    }
}

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "healthy",
        "service": state.service.name,
        "version": state.service.version,
    }))
    .into_response()
}

/// GET /
pub(super) async fn home(State(state): State<AppState>) -> Response {
    Json(json!({
        "message": format!("{} text analysis API", state.service.name),
        "version": state.service.version,
        "status": "running",
    }))
    .into_response()
}
