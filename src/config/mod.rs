//! Runtime configuration.
//!
//! One `AppConfig` describes every deployment of the tool: which metadata
//! columns the ingest form collects and whether the destination table is
//! typed by the operator or fixed. Values are layered from defaults, a TOML
//! file, `GBQ_TOOLKIT_*` environment variables and CLI flags.

mod sources;
mod validation;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use sources::{apply_env_overrides, load_with_env, EnvSource, StdEnvSource, ENV_PREFIX};

/// File read when no other config source is given.
pub const DEFAULT_CONFIG_FILE: &str = "./gbq-toolkit.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub splitter: SplitterConfig,
}

impl AppConfig {
    /// Loads configuration from the process environment and files.
    ///
    /// `explicit_path` (the `--config` flag) wins over every other file source.
    /// The result is not validated; callers apply CLI overrides first.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        load_with_env(explicit_path, &StdEnvSource)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Cap on a whole multipart request body.
    pub max_upload_bytes: usize,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            max_upload_bytes: 200 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingest
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Project jobs run in and unqualified table ids resolve against.
    /// Falls back to the uploaded key's own project.
    pub project_id: Option<String>,
    pub destination: Destination,
    pub metadata_fields: Vec<MetadataField>,
    /// BigQuery job location, e.g. "US" or "asia-southeast1".
    pub location: Option<String>,
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub load_timeout_secs: u64,
    pub preview_rows: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            destination: Destination::default(),
            metadata_fields: Vec::new(),
            location: None,
            api_base_url: "https://bigquery.googleapis.com".to_string(),
            poll_interval_ms: 1000,
            load_timeout_secs: 600,
            preview_rows: 5,
        }
    }
}

impl IngestConfig {
    /// Fields the operator fills in; `ingest_date` fields are filled automatically.
    pub fn form_fields(&self) -> impl Iterator<Item = &MetadataField> {
        self.metadata_fields
            .iter()
            .filter(|f| f.kind != MetadataKind::IngestDate)
    }
}

/// Where ingested rows go.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Destination {
    /// The operator types the table id on the form.
    #[default]
    FromUserInput,
    /// Every upload goes to one table; the form hides the table id input.
    Fixed { table_id: String },
}

/// A constant column added to every ingested row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    /// Column name in the destination table.
    pub column: String,
    /// Form label; defaults to the column name.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: MetadataKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl MetadataField {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    /// Free text entered on the form.
    #[default]
    Text,
    /// A `YYYY-MM-DD` date entered on the form.
    Date,
    /// Today's date, filled in at ingest time.
    IngestDate,
}

// ─────────────────────────────────────────────────────────────────────────────
// Splitter
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub default_rows_per_chunk: u64,
    pub default_prefix: String,
    pub preview_rows: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            default_rows_per_chunk: 1000,
            default_prefix: "output".to_string(),
            preview_rows: 5,
        }
    }
}
