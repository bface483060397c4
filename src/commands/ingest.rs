//! CSV ingest: annotate an upload with metadata and append it to BigQuery.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::{load_csv_blocking, non_blank, Preview};
use crate::bigquery::{
    AppendRequest, QualifiedTable, ServiceAccountCredential, TableRef, TableUploader,
    UploadReceipt, WriteMode,
};
use crate::config::{Destination, IngestConfig, MetadataField, MetadataKind};
use crate::dataset::{Dataset, Value};
use crate::error::AppError;

/// Shown when a required upload or the table id is missing.
pub const MISSING_INPUT_MESSAGE: &str =
    "Please upload both JSON and CSV files and provide a valid table ID.";

/// Date format for `date` and `ingest_date` metadata.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One submission of the ingest form.
#[derive(Default)]
pub struct IngestRequest {
    pub credential_json: Option<Vec<u8>>,
    pub csv: Option<Vec<u8>>,
    pub table_id: Option<String>,
    /// Submitted metadata values keyed by column name.
    pub metadata: HashMap<String, String>,
    pub write_mode: Option<String>,
    /// False for a preview; true when the operator pressed "Let's Ingest".
    pub confirmed: bool,
}

impl std::fmt::Debug for IngestRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestRequest")
            .field(
                "credential_json",
                &self.credential_json.as_ref().map(|_| "[REDACTED]"),
            )
            .field("csv_bytes", &self.csv.as_ref().map(Vec::len))
            .field("table_id", &self.table_id)
            .field("metadata", &self.metadata)
            .field("write_mode", &self.write_mode)
            .field("confirmed", &self.confirmed)
            .finish()
    }
}

/// What an ingest submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub destination: String,
    pub write_mode: WriteMode,
    pub preview: Preview,
    /// Present only when the upload ran.
    pub receipt: Option<UploadReceipt>,
}

/// Runs one ingest submission.
///
/// An unconfirmed request stops after the preview.
///
/// # Arguments
///
/// * `config` - Ingest settings: destination strategy and metadata fields
/// * `uploader` - Remote table upload
/// * `request` - The form submission
/// * `today` - Date used for `ingest_date` fields
///
/// # Errors
///
/// - `AppError::MissingInput` - credential, CSV or table id missing
/// - `AppError::InvalidArgument` - bad table id, write mode, metadata value, or no project
/// - `AppError::InvalidCredential` - key file rejected
/// - `AppError::MalformedInput` / `AppError::NotUtf8` - CSV rejected
/// - `AppError::UpstreamFailure` and friends - from the uploader
pub async fn run_ingest(
    config: &IngestConfig,
    uploader: &dyn TableUploader,
    request: IngestRequest,
    today: NaiveDate,
) -> Result<IngestOutcome, AppError> {
    let IngestRequest {
        credential_json,
        csv,
        table_id,
        metadata,
        write_mode,
        confirmed,
    } = request;

    let credential_json = credential_json.filter(|b| !b.is_empty());
    let csv = csv.filter(|b| !b.is_empty());

    let table_ref = match &config.destination {
        Destination::Fixed { table_id } => Some(table_id.as_str()),
        Destination::FromUserInput => non_blank(table_id.as_deref()),
    };

    let (credential_json, csv, table_ref) = match (credential_json, csv, table_ref) {
        (Some(c), Some(d), Some(t)) => (c, d, t),
        _ => return Err(AppError::MissingInput(MISSING_INPUT_MESSAGE.to_string())),
    };

    let table = TableRef::parse(table_ref)?;

    let write_mode = match non_blank(write_mode.as_deref()) {
        Some(raw) => raw.parse::<WriteMode>()?,
        None => WriteMode::default(),
    };

    let credential = ServiceAccountCredential::from_json_bytes(&credential_json)?;
    let destination = resolve_destination(table, config, &credential)?;

    let dataset = load_csv_blocking(csv).await?;
    let dataset = annotate(dataset, &config.metadata_fields, &metadata, today)?;

    let preview = Preview::of(&dataset, config.preview_rows);

    if !confirmed {
        info!(
            "[INGEST] Preview of {} rows for {}",
            dataset.len(),
            destination
        );
        return Ok(IngestOutcome {
            destination: destination.to_string(),
            write_mode,
            preview,
            receipt: None,
        });
    }

    info!(
        "[INGEST] Uploading {} rows to {}",
        dataset.len(),
        destination
    );

    let job_project = billing_project(config, &credential, &destination);
    let receipt = uploader
        .append(AppendRequest {
            dataset,
            destination: destination.clone(),
            job_project,
            credential,
            write_mode,
        })
        .await?;

    info!(
        "[INGEST] Loaded {} rows into {}",
        receipt.rows_loaded, receipt.destination
    );

    Ok(IngestOutcome {
        destination: destination.to_string(),
        write_mode,
        preview,
        receipt: Some(receipt),
    })
}

/// Picks the project: from the table id, then config, then the key file.
fn resolve_destination(
    table: TableRef,
    config: &IngestConfig,
    credential: &ServiceAccountCredential,
) -> Result<QualifiedTable, AppError> {
    if table.project_id().is_some() {
        return Ok(table.qualify(""));
    }

    let project = config
        .project_id
        .as_deref()
        .or(credential.project_id())
        .ok_or_else(|| {
            AppError::InvalidArgument(
                "No project id: use project.dataset.table or a key file that names its project"
                    .to_string(),
            )
        })?;

    Ok(table.qualify(project))
}

/// Project the load job runs in: config, then the key file, then the
/// destination's own project.
fn billing_project(
    config: &IngestConfig,
    credential: &ServiceAccountCredential,
    destination: &QualifiedTable,
) -> String {
    config
        .project_id
        .as_deref()
        .or(credential.project_id())
        .unwrap_or(&destination.project_id)
        .to_string()
}

/// Adds one constant column per configured metadata field.
fn annotate(
    mut dataset: Dataset,
    fields: &[MetadataField],
    submitted: &HashMap<String, String>,
    today: NaiveDate,
) -> Result<Dataset, AppError> {
    for field in fields {
        let value = metadata_value(field, submitted.get(&field.column).map(String::as_str), today)?;
        dataset = dataset.with_constant_column(&field.column, value);
    }
    Ok(dataset)
}

fn metadata_value(
    field: &MetadataField,
    submitted: Option<&str>,
    today: NaiveDate,
) -> Result<Value, AppError> {
    if field.kind == MetadataKind::IngestDate {
        return Ok(Value::Text(today.format(DATE_FORMAT).to_string()));
    }

    let raw = match non_blank(submitted) {
        Some(raw) => raw,
        None if field.required => {
            return Err(AppError::InvalidArgument(format!(
                "{} is required",
                field.display_label()
            )))
        }
        None => return Ok(Value::Null),
    };

    match field.kind {
        MetadataKind::Date => {
            let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                AppError::InvalidArgument(format!(
                    "{} must be a date like 2024-04-13, got '{}'",
                    field.display_label(),
                    raw
                ))
            })?;
            Ok(Value::Text(date.format(DATE_FORMAT).to_string()))
        }
        _ => Ok(Value::Text(raw.to_string())),
    }
}
