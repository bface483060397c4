//! Multipart form decoding for the ingest and splitter forms.
//!
//! Field names:
//! - ingest: `credential` (file), `csv` (file), `table_id`, `write_mode`,
//!   `meta.{column}` per metadata field, `action` (`preview` | `ingest`)
//! - split: `csv` (file), `mode`, `rows_per_chunk`, `column`, `prefix`

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::debug;

use crate::commands::{IngestRequest, SplitRequest};
use crate::error::AppError;

/// Prefix of metadata field names on the ingest form.
pub const METADATA_FIELD_PREFIX: &str = "meta.";

/// `action` value of the "Let's Ingest" button.
pub const ACTION_INGEST: &str = "ingest";

/// Reads the ingest form. `limit_bytes` is the body cap, named in errors.
pub async fn read_ingest_form(
    mut multipart: Multipart,
    limit_bytes: usize,
) -> Result<IngestRequest, AppError> {
    let mut request = IngestRequest::default();
    let upload_error = |e| upload_error(e, limit_bytes);

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };

        match name.as_str() {
            "credential" => request.credential_json = Some(read_bytes(field, limit_bytes).await?),
            "csv" => request.csv = Some(read_bytes(field, limit_bytes).await?),
            "table_id" => request.table_id = Some(read_text(field, limit_bytes).await?),
            "write_mode" => request.write_mode = Some(read_text(field, limit_bytes).await?),
            "action" => request.confirmed = read_text(field, limit_bytes).await?.trim() == ACTION_INGEST,
            other => match other.strip_prefix(METADATA_FIELD_PREFIX) {
                Some(column) => {
                    let column = column.to_string();
                    let value = read_text(field, limit_bytes).await?;
                    request.metadata.insert(column, value);
                }
                None => debug!(field = other, "Ignoring unknown ingest form field"),
            },
        }
    }

    Ok(request)
}

pub async fn read_split_form(
    mut multipart: Multipart,
    limit_bytes: usize,
) -> Result<SplitRequest, AppError> {
    let mut request = SplitRequest::default();
    let upload_error = |e| upload_error(e, limit_bytes);

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };

        match name.as_str() {
            "csv" => request.csv = Some(read_bytes(field, limit_bytes).await?),
            "mode" => request.mode = Some(read_text(field, limit_bytes).await?),
            "rows_per_chunk" => request.rows_per_chunk = Some(read_text(field, limit_bytes).await?),
            "column" => request.column = Some(read_text(field, limit_bytes).await?),
            "prefix" => request.prefix = Some(read_text(field, limit_bytes).await?),
            other => debug!(field = other, "Ignoring unknown split form field"),
        }
    }

    Ok(request)
}

async fn read_bytes(field: Field<'_>, limit_bytes: usize) -> Result<Vec<u8>, AppError> {
    field
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| upload_error(e, limit_bytes))
}

async fn read_text(field: Field<'_>, limit_bytes: usize) -> Result<String, AppError> {
    field.text().await.map_err(|e| upload_error(e, limit_bytes))
}

fn upload_error(err: MultipartError, limit_bytes: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::UploadTooLarge { limit_bytes };
    }
    AppError::InvalidArgument(format!("Could not read the upload: {}", err.body_text()))
}
