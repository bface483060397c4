use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use tracing::info;

use super::error::{log_rejection, status_of, ApiError};
use super::forms::{read_ingest_form, read_split_form};
use super::models::{HealthResponse, SplitResponse};
use super::pages;
use super::{PATH_API_INGEST, PATH_API_SPLIT, PATH_INGEST, PATH_SPLIT};
use crate::commands::{run_ingest, run_split, IngestOutcome, SplitOutcome};
use crate::error::AppError;
use crate::state::AppState;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn ingest(state: &AppState, multipart: Multipart) -> Result<IngestOutcome, AppError> {
    let request = read_ingest_form(multipart, state.config.server.max_upload_bytes).await?;
    run_ingest(
        &state.config.ingest,
        state.uploader.as_ref(),
        request,
        today(),
    )
    .await
}

async fn split(state: &AppState, multipart: Multipart) -> Result<SplitOutcome, AppError> {
    let request = read_split_form(multipart, state.config.server.max_upload_bytes).await?;
    run_split(&state.config.splitter, request).await
}

fn error_page(route: &str, err: &AppError, render: impl FnOnce(&AppError) -> String) -> Response {
    log_rejection(route, err);
    (status_of(err), Html(render(err))).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Pages
// ─────────────────────────────────────────────────────────────────────────────

/// Handler for GET /
pub async fn index_handler() -> Html<String> {
    Html(pages::index_page())
}

/// Handler for GET /ingest
pub async fn ingest_form_handler(State(state): State<AppState>) -> Html<String> {
    Html(pages::ingest_page(&state.config.ingest, None, None))
}

/// Handler for POST /ingest
pub async fn ingest_submit_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    match ingest(&state, multipart).await {
        Ok(outcome) => {
            info!(
                "[HTTP] POST {} -> 200 (uploaded: {})",
                PATH_INGEST,
                outcome.receipt.is_some()
            );
            Html(pages::ingest_page(&state.config.ingest, Some(&outcome), None)).into_response()
        }
        Err(err) => error_page(PATH_INGEST, &err, |err| {
            pages::ingest_page(&state.config.ingest, None, Some(&err.to_presentation()))
        }),
    }
}

/// Handler for GET /split
pub async fn split_form_handler(State(state): State<AppState>) -> Html<String> {
    Html(pages::split_page(&state.config.splitter, None, None))
}

/// Handler for POST /split
pub async fn split_submit_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    match split(&state, multipart).await {
        Ok(outcome) => {
            info!(
                "[HTTP] POST {} -> 200 ({} files)",
                PATH_SPLIT,
                outcome.artifacts.len()
            );
            Html(pages::split_page(&state.config.splitter, Some(&outcome), None)).into_response()
        }
        Err(err) => error_page(PATH_SPLIT, &err, |err| {
            pages::split_page(&state.config.splitter, None, Some(&err.to_presentation()))
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON API
// ─────────────────────────────────────────────────────────────────────────────

/// Handler for POST /api/ingest
pub async fn api_ingest_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<IngestOutcome>, ApiError> {
    let outcome = ingest(&state, multipart)
        .await
        .map_err(|e| ApiError::new(PATH_API_INGEST, e))?;
    info!("[HTTP] POST {} -> 200", PATH_API_INGEST);
    Ok(Json(outcome))
}

/// Handler for POST /api/split
pub async fn api_split_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SplitResponse>, ApiError> {
    let outcome = split(&state, multipart)
        .await
        .map_err(|e| ApiError::new(PATH_API_SPLIT, e))?;
    info!("[HTTP] POST {} -> 200", PATH_API_SPLIT);
    Ok(Json(SplitResponse::from(outcome)))
}

/// Handler for GET /health
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse::default()))
}
