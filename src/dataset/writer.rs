//! CSV serialization of a `Dataset`.

use csv::{Terminator, WriterBuilder};

use super::Dataset;
use crate::error::AppError;

impl Dataset {
    /// Serializes the dataset as CSV: a header row, then one line per row.
    ///
    /// Uses `,` as delimiter and `\n` as terminator, quoting only where
    /// needed. Missing values become empty fields.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the in-memory writer fails.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, AppError> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::with_capacity(self.len() * 32));

        writer
            .write_record(self.columns().iter().map(|c| c.name.as_str()))
            .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;

        for row in self.rows() {
            writer
                .write_record(row.iter().map(|v| v.render()))
                .map_err(|e| AppError::Internal(format!("Failed to write CSV record: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV writer: {}", e.error())))
    }
}
