//! CSV splitter flow: load, partition, serialize.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{non_blank, Preview};
use crate::config::SplitterConfig;
use crate::dataset::{load_csv, Column};
use crate::error::AppError;
use crate::split::{split, Artifact, SplitSpec};

/// Which splitter button was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    ByRowCount,
    ByColumnValue,
}

impl FromStr for SplitMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "by_row_count" => Ok(SplitMode::ByRowCount),
            "by_column_value" => Ok(SplitMode::ByColumnValue),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown split mode '{}'",
                other
            ))),
        }
    }
}

/// One submission of the splitter form. Values arrive as raw form text.
#[derive(Debug, Default)]
pub struct SplitRequest {
    pub csv: Option<Vec<u8>>,
    /// `None` loads the file and returns the preview and column list only.
    pub mode: Option<String>,
    pub rows_per_chunk: Option<String>,
    pub column: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub preview: Preview,
    pub columns: Vec<Column>,
    /// The split that ran, if any.
    pub spec: Option<SplitSpec>,
    pub artifacts: Vec<Artifact>,
}

/// Runs one splitter submission.
///
/// Loading, splitting and serialization happen on a blocking thread.
///
/// # Errors
///
/// - `AppError::MissingInput` - no CSV uploaded
/// - `AppError::InvalidArgument` - bad mode, row count, or column
/// - `AppError::MalformedInput` / `AppError::NotUtf8` - CSV rejected
pub async fn run_split(
    config: &SplitterConfig,
    mut request: SplitRequest,
) -> Result<SplitOutcome, AppError> {
    let csv = request
        .csv
        .take()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::MissingInput("Please upload a CSV file to split.".to_string()))?;

    let mode = non_blank(request.mode.as_deref())
        .map(str::parse::<SplitMode>)
        .transpose()?;
    let spec = match mode {
        Some(mode) => Some(build_spec(config, mode, &request)?),
        None => None,
    };
    let preview_rows = config.preview_rows;

    tokio::task::spawn_blocking(move || {
        let dataset = load_csv(&csv)?;
        let preview = Preview::of(&dataset, preview_rows);
        let columns = dataset.columns().to_vec();

        let artifacts = match &spec {
            Some(spec) => {
                let artifacts = split(&dataset, spec)?
                    .iter()
                    .map(|chunk| chunk.to_artifact())
                    .collect::<Result<Vec<_>, AppError>>()?;
                info!(
                    "[SPLIT] Split {} rows into {} files",
                    dataset.len(),
                    artifacts.len()
                );
                artifacts
            }
            None => Vec::new(),
        };

        Ok::<_, AppError>(SplitOutcome {
            preview,
            columns,
            spec,
            artifacts,
        })
    })
    .await
    .map_err(|e| AppError::Internal(format!("Split task failed: {}", e)))?
}

/// Builds a split specification from raw form values, filling defaults.
fn build_spec(
    config: &SplitterConfig,
    mode: SplitMode,
    request: &SplitRequest,
) -> Result<SplitSpec, AppError> {
    let name_prefix = non_blank(request.prefix.as_deref())
        .unwrap_or(&config.default_prefix)
        .to_string();

    match mode {
        SplitMode::ByRowCount => {
            let rows_per_chunk = match non_blank(request.rows_per_chunk.as_deref()) {
                Some(raw) => parse_row_count(raw)?,
                None => config.default_rows_per_chunk,
            };
            Ok(SplitSpec::ByRowCount {
                rows_per_chunk,
                name_prefix,
            })
        }
        SplitMode::ByColumnValue => {
            let column = request
                .column
                .as_deref()
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    AppError::InvalidArgument("Select a column to split by".to_string())
                })?
                .to_string();
            Ok(SplitSpec::ByColumnValue {
                column,
                name_prefix,
            })
        }
    }
}

/// Parses a row count typed on the form; zero and negatives are rejected.
fn parse_row_count(raw: &str) -> Result<u64, AppError> {
    let value: i64 = raw.parse().map_err(|_| {
        AppError::InvalidArgument(format!("Rows per file must be a whole number, got '{}'", raw))
    })?;
    if value < 1 {
        return Err(AppError::InvalidArgument(format!(
            "Rows per file must be at least 1, got {}",
            value
        )));
    }
    Ok(value as u64)
}
