//! Request handlers behind the form and JSON routes.
//!
//! Each flow takes a request value and returns an outcome; nothing is kept
//! between requests.

pub mod ingest;
pub mod split;

use serde::Serialize;

use crate::dataset::{load_csv, Column, Dataset, Record};
use crate::error::AppError;

pub use ingest::{run_ingest, IngestOutcome, IngestRequest};
pub use split::{run_split, SplitMode, SplitOutcome, SplitRequest};

/// The first rows of a dataset, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub columns: Vec<Column>,
    pub rows: Vec<Record>,
    pub total_rows: usize,
}

impl Preview {
    pub fn of(dataset: &Dataset, rows: usize) -> Self {
        let head = dataset.head(rows);
        Self {
            columns: head.columns().to_vec(),
            rows: head.rows().to_vec(),
            total_rows: dataset.len(),
        }
    }
}

/// Parses CSV bytes off the async runtime.
pub(crate) async fn load_csv_blocking(bytes: Vec<u8>) -> Result<Dataset, AppError> {
    tokio::task::spawn_blocking(move || load_csv(&bytes))
        .await
        .map_err(|e| AppError::Internal(format!("CSV load task failed: {}", e)))?
}

/// `None` for absent or whitespace-only form values.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
