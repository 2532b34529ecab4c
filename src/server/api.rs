// server/api.rs

use crate::server::AppState;
use crate::updater::ForceOutcome;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

pub const NOT_READY_MESSAGE: &str =
    "503 service unavailable\nthe server is not ready to handle your request";

/// Body of every JSON error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(current_snapshot))
        .route("/force", get(force_update))
        .route("/ping", get(ping))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
}

/// Latest snapshot, or 503 before the first successful update.
async fn current_snapshot(State(state): State<AppState>) -> Response {
    match state.store.read() {
        Some(snapshot) => (StatusCode::OK, Json(&*snapshot)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(NOT_READY_MESSAGE)),
        )
            .into_response(),
    }
}

/// Runs an update before answering. A fresh snapshot redirects to `/`.
async fn force_update(State(state): State<AppState>) -> Response {
    match state.orchestrator.force().await {
        ForceOutcome::Updated(snapshot) => (StatusCode::CREATED, Json(&*snapshot)).into_response(),
        ForceOutcome::Fresh(_) => (StatusCode::NOT_MODIFIED, [(header::LOCATION, "/")]).into_response(),
        ForceOutcome::Failed {
            previous: Some(snapshot),
            ..
        } => (StatusCode::OK, Json(&*snapshot)).into_response(),
        ForceOutcome::Failed {
            previous: None,
            error,
        } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(format!(
                "503 service unavailable\nupdate failed: {error}"
            ))),
        )
            .into_response(),
    }
}

async fn ping() -> &'static str {
    "OK"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
