//! Chunk file naming.
//!
//! Prefixes and group values are user data, so every character outside a
//! small safe set is percent-escaped per UTF-8 byte. The escape is
//! injective, which keeps one file name per distinct group value.

use crate::error::AppError;

/// Label used in place of the group value for rows whose key is missing.
///
/// Parentheses are always escaped in values, so no value can produce it.
pub const NULL_GROUP_LABEL: &str = "(null)";

/// File extension appended to every chunk name.
pub const CSV_EXTENSION: &str = ".csv";

/// Longest file name, in bytes, accepted by common filesystems.
pub const MAX_FILE_NAME_BYTES: usize = 255;

fn is_safe(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ')
}

/// Escapes a string for use inside a file name.
///
/// Keeps alphanumerics, `-`, `_`, `.` and space; every other character is
/// written as `%XX` for each byte of its UTF-8 encoding.
pub fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if is_safe(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

/// `{prefix}_rows_{index}.csv`
pub fn row_chunk_name(prefix: &str, index: usize) -> Result<String, AppError> {
    checked(format!(
        "{}_rows_{}{}",
        escape_component(prefix),
        index,
        CSV_EXTENSION
    ))
}

/// `{prefix}_{value}.csv`, with `(null)` standing in for a missing value.
pub fn group_chunk_name(prefix: &str, group_value: Option<&str>) -> Result<String, AppError> {
    let label = match group_value {
        Some(value) => escape_component(value),
        None => NULL_GROUP_LABEL.to_string(),
    };
    checked(format!(
        "{}_{}{}",
        escape_component(prefix),
        label,
        CSV_EXTENSION
    ))
}

fn checked(name: String) -> Result<String, AppError> {
    if name.len() > MAX_FILE_NAME_BYTES {
        return Err(AppError::InvalidArgument(format!(
            "Chunk file name is {} bytes long; the limit is {} bytes. Use a shorter prefix or a column with shorter values.",
            name.len(),
            MAX_FILE_NAME_BYTES
        )));
    }
    Ok(name)
}
