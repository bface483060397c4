//! CSV splitting: partition a dataset into named chunks.

mod file_name;
mod partitioner;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::AppError;

pub use file_name::{escape_component, NULL_GROUP_LABEL};
pub use partitioner::{split_by_column_value, split_by_row_count};

/// MIME type every artifact is offered under.
pub const CSV_MIME_TYPE: &str = "text/csv";

/// How to split a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SplitSpec {
    ByRowCount {
        rows_per_chunk: u64,
        name_prefix: String,
    },
    ByColumnValue {
        column: String,
        name_prefix: String,
    },
}

/// A named slice of the source dataset.
#[derive(Debug, Clone)]
pub struct Chunk {
    file_name: String,
    data: Dataset,
}

impl Chunk {
    pub(crate) fn new(file_name: String, data: Dataset) -> Self {
        Self { file_name, data }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Serializes the chunk for download.
    pub fn to_artifact(&self) -> Result<Artifact, AppError> {
        Ok(Artifact {
            file_name: self.file_name.clone(),
            mime_type: CSV_MIME_TYPE,
            row_count: self.row_count(),
            bytes: self.data.to_csv_bytes()?,
        })
    }
}

/// A serialized chunk ready to be offered as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub row_count: usize,
    pub bytes: Vec<u8>,
}

/// Partitions `dataset` according to `spec`.
///
/// # Errors
///
/// Returns `AppError::InvalidArgument` for a zero row count, an unknown
/// column, or a chunk name that is too long.
pub fn split(dataset: &Dataset, spec: &SplitSpec) -> Result<Vec<Chunk>, AppError> {
    match spec {
        SplitSpec::ByRowCount {
            rows_per_chunk,
            name_prefix,
        } => split_by_row_count(dataset, *rows_per_chunk, name_prefix),
        SplitSpec::ByColumnValue {
            column,
            name_prefix,
        } => split_by_column_value(dataset, column, name_prefix),
    }
}
