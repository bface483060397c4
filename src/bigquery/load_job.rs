//! BigQuery load-job client.
//!
//! This module provides functionality to:
//! - Fetch a destination table's schema
//! - Start a resumable CSV load job and upload the file body
//! - Poll a job until it finishes, cancelling it if it overruns
//!
//! # Security
//!
//! - CSV contents are never logged
//! - Auth headers and tokens are never logged
//! - Only HTTP method, path, and status codes are logged

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::table_ref::QualifiedTable;
use crate::error::AppError;

/// Job state BigQuery reports once a job has finished, successfully or not.
const DONE_STATE: &str = "DONE";

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// A column in a table schema.
#[derive(Debug, Clone, Deserialize)]
pub struct TableField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableField>,
}

/// The parts of a table resource the uploader reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    #[serde(default)]
    pub schema: Option<TableSchema>,
}

/// Error detail attached to a finished job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobError {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: String,
    #[serde(default)]
    pub error_result: Option<JobError>,
    #[serde(default)]
    pub errors: Vec<JobError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStatistics {
    /// int64 values arrive as JSON strings.
    #[serde(default)]
    pub output_rows: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatistics {
    #[serde(default)]
    pub load: Option<LoadStatistics>,
}

/// The parts of a job resource the uploader reads.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadJobInfo {
    pub status: JobStatus,
    #[serde(default)]
    pub statistics: Option<JobStatistics>,
}

impl LoadJobInfo {
    pub fn is_done(&self) -> bool {
        self.status.state == DONE_STATE
    }

    /// Rows written by the job, when BigQuery reports them.
    pub fn output_rows(&self) -> Option<u64> {
        self.statistics
            .as_ref()?
            .load
            .as_ref()?
            .output_rows
            .as_deref()?
            .parse()
            .ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobResource<'a> {
    job_reference: JobReference<'a>,
    configuration: JobConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobReference<'a> {
    project_id: &'a str,
    job_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadConfiguration<'a> {
    destination_table: TableReference<'a>,
    source_format: &'static str,
    skip_leading_rows: u32,
    write_disposition: &'static str,
    create_disposition: &'static str,
    allow_quoted_newlines: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

/// Google API error envelope: `{"error": {...}}`.
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<JobError>,
}

// ─────────────────────────────────────────────────────────────────────────────
// LoadJobClient
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the BigQuery REST endpoints a CSV append needs.
#[derive(Clone)]
pub struct LoadJobClient {
    /// Shared HTTP client.
    client: Arc<Client>,
    /// API root (e.g., "https://bigquery.googleapis.com").
    base_url: Url,
    /// Access token for authentication.
    access_token: SecretString,
    /// Job location (e.g., "US", "asia-southeast1"); BigQuery infers it when absent.
    location: Option<String>,
}

impl LoadJobClient {
    /// Creates a new load-job client.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `base_url` - BigQuery API root
    /// * `access_token` - OAuth access token with the BigQuery scope
    /// * `location` - Job location, if pinned
    pub fn new(
        client: Arc<Client>,
        base_url: Url,
        access_token: SecretString,
        location: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            access_token,
            location,
        }
    }

    /// Fetches the destination table resource.
    ///
    /// # Errors
    ///
    /// - `AppError::UpstreamFailure` - table missing (404) or API error
    /// - `AppError::ConnectionFailed` - Network error
    pub async fn get_table(&self, table: &QualifiedTable) -> Result<TableInfo, AppError> {
        let url = self.build_url(&[
            "bigquery",
            "v2",
            "projects",
            &table.project_id,
            "datasets",
            &table.dataset_id,
            "tables",
            &table.table_id,
        ])?;

        info!("[BQ-LOAD] GET /tables/{} (schema)", table.table_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Table lookup failed: {}", e)))?;

        let status = response.status();
        info!(
            "[BQ-LOAD] GET /tables/{} -> {}",
            table.table_id,
            status.as_u16()
        );

        if !status.is_success() {
            let what = format!("Destination table {}", table);
            return Err(parse_error_response(response, status, &what).await);
        }

        response.json().await.map_err(|e| {
            AppError::UpstreamFailure(format!("Failed to parse table response: {}", e))
        })
    }

    /// Starts a resumable load job appending CSV to `table`.
    ///
    /// # Returns
    ///
    /// The upload session URL the CSV body must be sent to.
    ///
    /// # Errors
    ///
    /// - `AppError::UpstreamFailure` - API error or no session URL returned
    /// - `AppError::ConnectionFailed` - Network error
    pub async fn start_load_job(
        &self,
        table: &QualifiedTable,
        job_project: &str,
        job_id: &str,
    ) -> Result<Url, AppError> {
        let mut url = self.build_url(&[
            "upload",
            "bigquery",
            "v2",
            "projects",
            job_project,
            "jobs",
        ])?;
        url.query_pairs_mut().append_pair("uploadType", "resumable");

        let body = JobResource {
            job_reference: JobReference {
                project_id: job_project,
                job_id,
                location: self.location.as_deref(),
            },
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    destination_table: TableReference {
                        project_id: &table.project_id,
                        dataset_id: &table.dataset_id,
                        table_id: &table.table_id,
                    },
                    source_format: "CSV",
                    skip_leading_rows: 1,
                    write_disposition: "WRITE_APPEND",
                    create_disposition: "CREATE_NEVER",
                    allow_quoted_newlines: true,
                },
            },
        };

        info!(
            "[BQ-LOAD] POST /jobs?uploadType=resumable (job {})",
            redact_id(job_id)
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
            .header("X-Upload-Content-Type", "text/csv")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Load job creation failed: {}", e)))?;

        let status = response.status();
        info!(
            "[BQ-LOAD] POST /jobs?uploadType=resumable -> {}",
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status, "Project").await);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::UpstreamFailure("Load job response had no upload session URL".to_string())
            })?;

        self.base_url.join(location).map_err(|e| {
            AppError::UpstreamFailure(format!("Upload session URL is not valid: {}", e))
        })
    }

    /// Sends the whole CSV body to an upload session.
    ///
    /// # Errors
    ///
    /// - `AppError::UpstreamFailure` - API error
    /// - `AppError::ConnectionFailed` - Network error
    pub async fn upload_csv(&self, session_url: Url, job_id: &str, csv: Vec<u8>) -> Result<(), AppError> {
        let size = csv.len();

        info!(
            "[BQ-LOAD] PUT /upload session for job {} ({} bytes)",
            redact_id(job_id),
            size
        );

        let response = self
            .client
            .put(session_url)
            .bearer_auth(self.access_token.expose_secret())
            .header("Content-Type", "text/csv")
            .body(csv)
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("CSV upload failed: {}", e)))?;

        let status = response.status();
        info!(
            "[BQ-LOAD] PUT /upload session for job {} -> {}",
            redact_id(job_id),
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status, "Upload session").await);
        }

        Ok(())
    }

    /// Gets the current state of a job.
    ///
    /// # Errors
    ///
    /// - `AppError::UpstreamFailure` - job missing or API error
    /// - `AppError::ConnectionFailed` - Network error
    pub async fn get_job(&self, project_id: &str, job_id: &str) -> Result<LoadJobInfo, AppError> {
        let mut url = self.build_url(&["bigquery", "v2", "projects", project_id, "jobs", job_id])?;
        if let Some(location) = &self.location {
            url.query_pairs_mut().append_pair("location", location);
        }

        debug!("[BQ-LOAD] GET /jobs/{} (status)", redact_id(job_id));

        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Job status check failed: {}", e)))?;

        let status = response.status();
        debug!(
            "[BQ-LOAD] GET /jobs/{} -> {}",
            redact_id(job_id),
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status, "Load job").await);
        }

        response.json().await.map_err(|e| {
            AppError::UpstreamFailure(format!("Failed to parse job status response: {}", e))
        })
    }

    /// Asks BigQuery to cancel a job. Cancellation is best effort: a job
    /// that is already committing may still finish.
    ///
    /// # Errors
    ///
    /// - `AppError::UpstreamFailure` - job missing or API error
    /// - `AppError::ConnectionFailed` - Network error
    pub async fn cancel_job(&self, project_id: &str, job_id: &str) -> Result<(), AppError> {
        let mut url = self.build_url(&[
            "bigquery", "v2", "projects", project_id, "jobs", job_id, "cancel",
        ])?;
        if let Some(location) = &self.location {
            url.query_pairs_mut().append_pair("location", location);
        }

        info!("[BQ-LOAD] POST /jobs/{}/cancel", redact_id(job_id));

        let response = self
            .client
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Job cancel failed: {}", e)))?;

        let status = response.status();
        info!(
            "[BQ-LOAD] POST /jobs/{}/cancel -> {}",
            redact_id(job_id),
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status, "Load job").await);
        }
        Ok(())
    }

    /// Polls a job until it is `DONE`.
    ///
    /// When `timeout` elapses first, the job is cancelled before returning.
    ///
    /// # Errors
    ///
    /// - `AppError::JobFailed` - the job finished with an `errorResult`
    /// - `AppError::UpstreamFailure` - `timeout` elapsed first, or API error
    pub async fn wait_for_job(
        &self,
        project_id: &str,
        job_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<LoadJobInfo, AppError> {
        let deadline = Instant::now() + timeout;

        loop {
            let job = self.get_job(project_id, job_id).await?;

            if job.is_done() {
                if let Some(error) = &job.status.error_result {
                    return Err(AppError::JobFailed {
                        job_id: job_id.to_string(),
                        message: describe_job_errors(error, &job.status.errors),
                    });
                }
                info!("[BQ-LOAD] Job {} finished", redact_id(job_id));
                return Ok(job);
            }

            debug!(
                "[BQ-LOAD] Job {} is {}",
                redact_id(job_id),
                job.status.state
            );

            if Instant::now() + poll_interval > deadline {
                if let Err(e) = self.cancel_job(project_id, job_id).await {
                    warn!("[BQ-LOAD] Could not cancel job {}: {}", redact_id(job_id), e);
                }
                return Err(AppError::UpstreamFailure(format!(
                    "Load job {} did not finish within {} seconds and a cancel was requested. \
                     The job may still complete; check its status in BigQuery before retrying",
                    job_id,
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // URL Builders
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends percent-encoded path segments to the API root.
    fn build_url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("BigQuery base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling
// ─────────────────────────────────────────────────────────────────────────────

/// Parses an error response and maps it to an `AppError`.
///
/// `resource` names what a 404 refers to.
async fn parse_error_response(
    response: reqwest::Response,
    status: StatusCode,
    resource: &str,
) -> AppError {
    if status == StatusCode::NOT_FOUND {
        return AppError::UpstreamFailure(format!("{} not found", resource));
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("Unable to read error body"));

    if let Ok(envelope) = serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        let error = envelope.error;
        let reason = error
            .errors
            .first()
            .and_then(|e| e.reason.clone())
            .or(error.status);
        return match reason {
            Some(reason) => AppError::UpstreamFailure(format!("[{}] {}", reason, error.message)),
            None => AppError::UpstreamFailure(error.message),
        };
    }

    AppError::UpstreamFailure(format!(
        "HTTP {} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown error")
    ))
}

/// Formats a job's `errorResult`, adding the first detailed error when it
/// says more than the summary.
fn describe_job_errors(result: &JobError, errors: &[JobError]) -> String {
    let summary = format_job_error(result);
    match errors.iter().find(|e| e.message != result.message) {
        Some(detail) => format!("{}; {}", summary, format_job_error(detail)),
        None => summary,
    }
}

fn format_job_error(error: &JobError) -> String {
    let message = error.message.as_deref().unwrap_or("Unknown error");
    match &error.reason {
        Some(reason) => format!("[{}] {}", reason, message),
        None => message.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Redacts a job ID for logging (shows first 20 chars).
pub(crate) fn redact_id(id: &str) -> String {
    match id.char_indices().nth(20) {
        Some((end, _)) => format!("{}...", &id[..end]),
        None => id.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
