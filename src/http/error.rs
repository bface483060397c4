use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::{AppError, ErrorKind};

/// HTTP status reported for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::MalformedInput | ErrorKind::InvalidCredential => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// HTTP status for one error: its kind's status, except oversized uploads.
pub fn status_of(err: &AppError) -> StatusCode {
    match err {
        AppError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        other => status_for(other.kind()),
    }
}

/// Logs a failed request at a level matching its status.
pub fn log_rejection(route: &str, err: &AppError) {
    let status = status_of(err);
    if status.is_server_error() {
        error!(route, status = status.as_u16(), "Request failed: {}", err);
    } else {
        warn!(route, status = status.as_u16(), "Request rejected: {}", err);
    }
}

/// JSON error for the `/api` routes.
#[derive(Debug)]
pub struct ApiError {
    pub route: &'static str,
    pub error: AppError,
}

impl ApiError {
    pub fn new(route: &'static str, error: AppError) -> Self {
        Self { route, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log_rejection(self.route, &self.error);
        let status = status_of(&self.error);
        let body = Json(json!({ "error": self.error.to_presentation() }));
        (status, body).into_response()
    }
}
