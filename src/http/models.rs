//! JSON bodies returned by the `/api` routes.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

use crate::commands::{Preview, SplitOutcome};
use crate::dataset::Column;
use crate::split::{Artifact, SplitSpec};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// One downloadable file, with its bytes base64-encoded.
#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    pub file_name: String,
    pub mime_type: &'static str,
    pub row_count: usize,
    pub content: String,
}

impl From<&Artifact> for ArtifactResponse {
    fn from(artifact: &Artifact) -> Self {
        Self {
            file_name: artifact.file_name.clone(),
            mime_type: artifact.mime_type,
            row_count: artifact.row_count,
            content: STANDARD.encode(&artifact.bytes),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SplitResponse {
    pub preview: Preview,
    pub columns: Vec<Column>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<SplitSpec>,
    pub artifacts: Vec<ArtifactResponse>,
}

impl From<SplitOutcome> for SplitResponse {
    fn from(outcome: SplitOutcome) -> Self {
        Self {
            artifacts: outcome.artifacts.iter().map(ArtifactResponse::from).collect(),
            preview: outcome.preview,
            columns: outcome.columns,
            spec: outcome.spec,
        }
    }
}
