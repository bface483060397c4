//! In-memory tabular data: typed columns and ordered rows.
//!
//! A `Dataset` is what the loader produces from an uploaded CSV, what the
//! partitioner splits, and what the uploader ships to BigQuery.

mod loader;
mod value;
mod writer;

use std::ops::Range;

use serde::Serialize;

use crate::error::AppError;

pub use loader::load_csv;
pub use value::{is_missing, ColumnType, Value, MISSING_MARKERS};

/// One row. Cells are positional and line up with `Dataset::columns`.
pub type Record = Vec<Value>;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// An ordered table with a fixed column set.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Record>,
}

impl Dataset {
    /// Builds a dataset, checking that every row has one cell per column.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if a row width differs from the
    /// column count or two columns share a name.
    pub fn new(columns: Vec<Column>, rows: Vec<Record>) -> Result<Self, AppError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(AppError::InvalidArgument(format!(
                    "Duplicate column name '{}'",
                    column.name
                )));
            }
        }

        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(AppError::InvalidArgument(format!(
                "Row {} has {} values, expected {}",
                index,
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Builds a dataset sharing this one's columns. Rows must already match.
    fn derive(&self, rows: Vec<Record>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of the named column, matched exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows (all rows if there are fewer).
    pub fn head(&self, n: usize) -> Dataset {
        self.slice(0..n.min(self.rows.len()))
    }

    /// Rows in the given positional range. The range must be in bounds.
    pub fn slice(&self, range: Range<usize>) -> Dataset {
        self.derive(self.rows[range].to_vec())
    }

    /// Rows at the given positions, in the order given.
    pub fn take(&self, positions: &[usize]) -> Dataset {
        self.derive(positions.iter().map(|&i| self.rows[i].clone()).collect())
    }

    /// Sets `name` to `value` in every row.
    ///
    /// Appends a new column, or overwrites the column in place when one with
    /// that name already exists.
    pub fn with_constant_column(mut self, name: &str, value: Value) -> Dataset {
        let column_type = match &value {
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Null | Value::Text(_) => ColumnType::Text,
        };

        match self.column_index(name) {
            Some(index) => {
                self.columns[index].column_type = column_type;
                for row in &mut self.rows {
                    row[index] = value.clone();
                }
            }
            None => {
                self.columns.push(Column::new(name, column_type));
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
        self
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::text_dataset;
    use super::*;

    #[test]
    fn test_new_rejects_ragged_rows() {
        let columns = vec![
            Column::new("a", ColumnType::Text),
            Column::new("b", ColumnType::Text),
        ];
        let rows = vec![vec![Value::Null, Value::Null], vec![Value::Null]];

        let err = Dataset::new(columns, rows).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(msg) if msg.contains("Row 1")));
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let columns = vec![
            Column::new("a", ColumnType::Text),
            Column::new("a", ColumnType::Integer),
        ];
        assert!(Dataset::new(columns, vec![]).is_err());
    }

    #[test]
    fn test_head_is_clamped() {
        let ds = text_dataset(&["id"], &[&["1"], &["2"], &["3"]]);
        assert_eq!(ds.head(2).len(), 2);
        assert_eq!(ds.head(10).len(), 3);
        assert_eq!(ds.head(0).len(), 0);
        assert_eq!(ds.head(2).column_names(), vec!["id"]);
    }

    #[test]
    fn test_take_preserves_requested_order() {
        let ds = text_dataset(&["id"], &[&["a"], &["b"], &["c"]]);
        let picked = ds.take(&[2, 0]);
        assert_eq!(picked.rows()[0][0], Value::Text("c".into()));
        assert_eq!(picked.rows()[1][0], Value::Text("a".into()));
    }

    #[test]
    fn test_with_constant_column_appends() {
        let ds = text_dataset(&["id"], &[&["1"], &["2"]])
            .with_constant_column("campaign", Value::Text("songkran".into()));

        assert_eq!(ds.column_names(), vec!["id", "campaign"]);
        assert!(ds
            .rows()
            .iter()
            .all(|row| row[1] == Value::Text("songkran".into())));
    }

    #[test]
    fn test_with_constant_column_overwrites_existing() {
        let ds = text_dataset(&["id", "campaign"], &[&["1", "old"], &["2", ""]])
            .with_constant_column("campaign", Value::Text("new".into()));

        assert_eq!(ds.column_names(), vec!["id", "campaign"]);
        assert_eq!(ds.rows()[0][1], Value::Text("new".into()));
        assert_eq!(ds.rows()[1][1], Value::Text("new".into()));
    }
}
