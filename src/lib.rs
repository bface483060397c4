//! gbq-toolkit: a small web form for appending CSV files to BigQuery tables
//! and for splitting CSV files into downloadable pieces.

pub mod bigquery;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod error;
pub mod http;
pub mod split;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::bigquery::BigQueryUploader;
use crate::config::{AppConfig, Destination};
use crate::state::AppState;

pub use error::AppError;

/// Builds the BigQuery uploader and serves the web form until shutdown.
pub async fn run(config: AppConfig) -> Result<()> {
    let uploader = BigQueryUploader::from_config(&config.ingest)?;

    match &config.ingest.destination {
        Destination::Fixed { table_id } => {
            info!("[STARTUP] Destination fixed to {}", table_id)
        }
        Destination::FromUserInput => info!("[STARTUP] Destination taken from the form"),
    }
    info!(
        "[STARTUP] {} metadata field(s) configured",
        config.ingest.metadata_fields.len()
    );

    http::serve(AppState::new(config, Arc::new(uploader))).await
}
