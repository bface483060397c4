// Configuration validation
//
// Rejects values the server cannot run with and warns about risky ones.

use std::collections::HashSet;
use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use tracing::warn;
use url::Url;

use super::{AppConfig, Destination, IngestConfig, ServerConfig, SplitterConfig};
use crate::bigquery::TableRef;

pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_ingest_config(&config.ingest)?;
    validate_splitter_config(&config.splitter)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    config
        .listen_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("server.listen_addr '{}' is not a socket address", config.listen_addr))?;

    if config.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be greater than 0");
    }

    if config.max_upload_bytes > 1024 * 1024 * 1024 {
        // 1 GB
        warn!(
            max_upload_bytes = config.max_upload_bytes,
            "server.max_upload_bytes is very large; uploads are held in memory"
        );
    }

    Ok(())
}

fn validate_ingest_config(config: &IngestConfig) -> Result<()> {
    if let Destination::Fixed { table_id } = &config.destination {
        if table_id.trim().is_empty() {
            bail!("ingest.destination.table_id must not be empty for a fixed destination");
        }
        TableRef::parse(table_id)
            .with_context(|| format!("ingest.destination.table_id '{}' is invalid", table_id))?;
    }

    let mut seen = HashSet::new();
    for field in &config.metadata_fields {
        if field.column.trim().is_empty() {
            bail!("ingest.metadata_fields entries need a non-empty column");
        }
        if !seen.insert(field.column.to_ascii_lowercase()) {
            bail!(
                "ingest.metadata_fields has column '{}' more than once",
                field.column
            );
        }
    }

    if config.poll_interval_ms == 0 {
        bail!("ingest.poll_interval_ms must be greater than 0");
    }

    if config.load_timeout_secs == 0 {
        bail!("ingest.load_timeout_secs must be greater than 0");
    }

    if config.preview_rows == 0 {
        bail!("ingest.preview_rows must be greater than 0");
    }

    let base = Url::parse(&config.api_base_url)
        .with_context(|| format!("ingest.api_base_url '{}' is not a URL", config.api_base_url))?;
    if base.cannot_be_a_base() {
        bail!("ingest.api_base_url must be an http(s) URL");
    }

    if config.project_id.is_none() {
        warn!("ingest.project_id is not set; each upload uses its key's project");
    }

    Ok(())
}

fn validate_splitter_config(config: &SplitterConfig) -> Result<()> {
    if config.default_rows_per_chunk == 0 {
        bail!("splitter.default_rows_per_chunk must be greater than 0");
    }

    if config.preview_rows == 0 {
        bail!("splitter.preview_rows must be greater than 0");
    }

    Ok(())
}
