//! BigQuery upload layer.
//!
//! - **Credentials** parsed from an uploaded service-account key
//! - **Access tokens** via `yup-oauth2`
//! - **Load jobs** over the REST API with `reqwest`
//!
//! One append is one load job, so a failed upload leaves the table untouched.

pub mod auth;
pub mod credentials;
pub mod load_job;
pub mod table_ref;

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::dataset::Dataset;
use crate::error::AppError;

pub use credentials::ServiceAccountCredential;
pub use load_job::{LoadJobClient, TableSchema};
pub use table_ref::{QualifiedTable, TableRef};

/// Prefix of every job id this service creates.
pub const JOB_ID_PREFIX: &str = "gbq_toolkit_";

// ─────────────────────────────────────────────────────────────────────────────
// Request / Receipt
// ─────────────────────────────────────────────────────────────────────────────

/// How rows are written to the destination table. Only appends are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Append,
}

impl WriteMode {
    pub const ALL: &'static [WriteMode] = &[WriteMode::Append];

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Append => "append",
        }
    }
}

impl FromStr for WriteMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "append" => Ok(WriteMode::Append),
            other => Err(AppError::InvalidArgument(format!(
                "Write mode '{}' is not supported; only 'append' is available",
                other
            ))),
        }
    }
}

/// Everything one append needs.
#[derive(Debug)]
pub struct AppendRequest {
    pub dataset: Dataset,
    pub destination: QualifiedTable,
    /// Project the load job runs and is billed in; may differ from the
    /// destination's project.
    pub job_project: String,
    pub credential: ServiceAccountCredential,
    pub write_mode: WriteMode,
}

/// Result of a finished load job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub job_id: String,
    pub destination: String,
    pub rows_loaded: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Uploader Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Appends a dataset to a remote table, allowing test fakes.
pub trait TableUploader: Send + Sync {
    /// Appends every row of `request.dataset` or fails without partial writes.
    fn append<'a>(
        &'a self,
        request: AppendRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UploadReceipt, AppError>> + Send + 'a>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// BigQueryUploader
// ─────────────────────────────────────────────────────────────────────────────

/// Uploads through a BigQuery load job per request.
pub struct BigQueryUploader {
    client: Arc<Client>,
    api_base_url: Url,
    location: Option<String>,
    poll_interval: Duration,
    load_timeout: Duration,
}

impl BigQueryUploader {
    pub fn new(
        client: Arc<Client>,
        api_base_url: Url,
        location: Option<String>,
        poll_interval: Duration,
        load_timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base_url,
            location,
            poll_interval,
            load_timeout,
        }
    }

    /// Builds an uploader from the ingest settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the API base URL does not parse or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &IngestConfig) -> Result<Self, AppError> {
        let api_base_url = Url::parse(&config.api_base_url).map_err(|e| {
            AppError::Internal(format!("Invalid BigQuery API base URL: {}", e))
        })?;
        let client = Client::builder()
            .user_agent(concat!("gbq-toolkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::new(
            Arc::new(client),
            api_base_url,
            config.location.clone(),
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_secs(config.load_timeout_secs),
        ))
    }

    async fn run_append(&self, request: AppendRequest) -> Result<UploadReceipt, AppError> {
        let AppendRequest {
            dataset,
            destination,
            job_project,
            credential,
            write_mode,
        } = request;

        let access_token = auth::fetch_access_token(&credential).await?;
        let client = LoadJobClient::new(
            self.client.clone(),
            self.api_base_url.clone(),
            access_token,
            self.location.clone(),
        );

        let table = client.get_table(&destination).await?;
        ensure_columns_match(
            &destination,
            &table.schema.unwrap_or_default(),
            &dataset.column_names(),
        )?;

        let row_count = dataset.len() as u64;
        let csv = tokio::task::spawn_blocking(move || dataset.to_csv_bytes())
            .await
            .map_err(|e| AppError::Internal(format!("CSV serialization task failed: {}", e)))??;

        let job_id = format!("{}{}", JOB_ID_PREFIX, Uuid::new_v4());
        info!(
            "[BQ-LOAD] Starting {} of {} rows into {}",
            write_mode.as_str(),
            row_count,
            destination
        );

        let session_url = client
            .start_load_job(&destination, &job_project, &job_id)
            .await?;
        client.upload_csv(session_url, &job_id, csv).await?;
        let job = client
            .wait_for_job(
                &job_project,
                &job_id,
                self.poll_interval,
                self.load_timeout,
            )
            .await?;

        Ok(UploadReceipt {
            job_id,
            destination: destination.to_string(),
            rows_loaded: job.output_rows().unwrap_or(row_count),
        })
    }
}

impl TableUploader for BigQueryUploader {
    fn append<'a>(
        &'a self,
        request: AppendRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UploadReceipt, AppError>> + Send + 'a>> {
        Box::pin(self.run_append(request))
    }
}

/// Checks the dataset columns against the table schema, by name and position.
///
/// BigQuery column names are case-insensitive; a CSV load maps fields by
/// position, so order matters as much as names.
pub fn ensure_columns_match(
    table: &QualifiedTable,
    schema: &TableSchema,
    columns: &[&str],
) -> Result<(), AppError> {
    let expected: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();

    let matches = expected.len() == columns.len()
        && expected
            .iter()
            .zip(columns)
            .all(|(want, got)| want.eq_ignore_ascii_case(got));

    if matches {
        return Ok(());
    }

    warn!(
        expected = expected.len(),
        actual = columns.len(),
        "Column mismatch against {}",
        table
    );

    Err(AppError::InvalidArgument(format!(
        "The file's columns must match table {} in name and order. Table: [{}]. File: [{}]",
        table,
        expected.join(", "),
        columns.join(", ")
    )))
}
