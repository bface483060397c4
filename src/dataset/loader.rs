//! CSV decoding into a typed `Dataset`.
//!
//! Uses the `csv` crate so quoted fields with embedded commas and newlines
//! survive intact. Column types are inferred after the whole file is read.

use std::collections::HashSet;

use csv::ReaderBuilder;
use tracing::debug;

use super::{Column, ColumnType, Dataset};
use crate::error::AppError;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parses uploaded CSV bytes into a dataset.
///
/// The first row is the header. Empty header names become `Unnamed: {i}`
/// and repeated names get `.1`, `.2`, ... suffixes.
///
/// # Errors
///
/// - `AppError::NotUtf8` - the bytes are not UTF-8 (after an optional BOM)
/// - `AppError::MalformedInput` - empty file, no header, unequal row widths
///   or any other CSV syntax error
pub fn load_csv(bytes: &[u8]) -> Result<Dataset, AppError> {
    let data = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if data.is_empty() {
        return Err(AppError::MalformedInput("The file is empty".to_string()));
    }

    if std::str::from_utf8(data).is_err() {
        return Err(AppError::NotUtf8);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::MalformedInput(format!("Failed to read CSV header: {}", e)))?
        .iter()
        .map(String::from)
        .collect();

    if headers.is_empty() {
        return Err(AppError::MalformedInput(
            "CSV file has no header row".to_string(),
        ));
    }

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(describe_record_error)?;
        raw_rows.push(record.iter().map(String::from).collect());
    }

    let names = normalize_headers(headers);
    let columns: Vec<Column> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let column_type = ColumnType::infer(raw_rows.iter().map(|row| row[i].as_str()));
            Column::new(name, column_type)
        })
        .collect();

    let rows = raw_rows
        .iter()
        .map(|raw| {
            raw.iter()
                .zip(&columns)
                .map(|(cell, column)| column.column_type.parse(cell))
                .collect()
        })
        .collect();

    let dataset = Dataset::new(columns, rows)?;

    debug!(
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "Loaded CSV"
    );

    Ok(dataset)
}

/// Converts a csv record error into a message naming the offending line.
fn describe_record_error(err: csv::Error) -> AppError {
    let line = err.position().map(|p| p.line());
    let message = match (err.kind(), line) {
        (
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            },
            Some(line),
        ) => format!(
            "line {} has {} fields, expected {}",
            line, len, expected_len
        ),
        (_, Some(line)) => format!("line {}: {}", line, err),
        (_, None) => err.to_string(),
    };
    AppError::MalformedInput(message)
}

/// Fills blank header names and makes repeated names unique.
fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(headers.len());

    for (i, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(name.clone());
        names.push(name);
    }

    names
}
