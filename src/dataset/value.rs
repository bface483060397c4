//! Typed cell values and per-column type inference.

use std::fmt;

use serde::Serialize;

/// Cell texts treated as missing values. Matched exactly, without trimming.
pub const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#N/A N/A", "#NA", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
];

const TRUE_LITERALS: &[&str] = &["True", "true", "TRUE"];
const FALSE_LITERALS: &[&str] = &["False", "false", "FALSE"];

/// Returns true if the raw cell text denotes a missing value.
pub fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw)
}

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    /// Infers the narrowest type that accepts every non-missing cell.
    ///
    /// Integer beats Float beats Boolean beats Text. A column holding only
    /// missing values is Text.
    pub fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let present: Vec<&str> = cells.filter(|c| !is_missing(c)).collect();
        if present.is_empty() {
            return ColumnType::Text;
        }

        if present.iter().all(|c| parse_integer(c).is_some()) {
            ColumnType::Integer
        } else if present.iter().all(|c| parse_float(c).is_some()) {
            ColumnType::Float
        } else if present.iter().all(|c| parse_bool(c).is_some()) {
            ColumnType::Boolean
        } else {
            ColumnType::Text
        }
    }

    /// Converts raw cell text into a value of this type.
    ///
    /// Callers must have inferred the type from the same cells; a cell that
    /// does not fit falls back to `Value::Text`.
    pub fn parse(self, raw: &str) -> Value {
        if is_missing(raw) {
            return Value::Null;
        }
        let parsed = match self {
            ColumnType::Integer => parse_integer(raw).map(Value::Integer),
            ColumnType::Float => parse_float(raw).map(Value::Float),
            ColumnType::Boolean => parse_bool(raw).map(Value::Boolean),
            ColumnType::Text => None,
        };
        parsed.unwrap_or_else(|| Value::Text(raw.to_string()))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Text => write!(f, "text"),
        }
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    // Rust accepts "inf"/"infinity" spellings that should stay text here.
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(raw: &str) -> Option<bool> {
    if TRUE_LITERALS.contains(&raw) {
        Some(true)
    } else if FALSE_LITERALS.contains(&raw) {
        Some(false)
    } else {
        None
    }
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value as CSV cell text. `Null` renders empty.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(v) => v.to_string(),
            // Debug formatting keeps the decimal point on whole floats ("1.0").
            Value::Float(v) => format!("{:?}", v),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Key used for grouping by exact value equality.
    ///
    /// Values in one column share a type, so the rendered text is an exact
    /// equality key; `None` stands for the missing-value group.
    pub fn group_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            // -0.0 == 0.0, so both share the 0.0 group.
            Value::Float(v) if *v == 0.0 => Some(Value::Float(0.0).render()),
            other => Some(other.render()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(cells: &[&str]) -> ColumnType {
        ColumnType::infer(cells.iter().copied())
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing(""));
        assert!(is_missing("NaN"));
        assert!(is_missing("NULL"));
        assert!(!is_missing("Null"));
        assert!(!is_missing(" "));
        assert!(!is_missing("0"));
    }

    #[test]
    fn test_infer_integer_ignores_missing_cells() {
        assert_eq!(infer(&["1", "", "-3", "NA"]), ColumnType::Integer);
    }

    #[test]
    fn test_infer_float_when_any_cell_has_fraction() {
        assert_eq!(infer(&["1", "2.5", "3"]), ColumnType::Float);
        assert_eq!(infer(&["1e3", "2"]), ColumnType::Float);
    }

    #[test]
    fn test_infer_boolean_and_text() {
        assert_eq!(infer(&["True", "false", ""]), ColumnType::Boolean);
        assert_eq!(infer(&["True", "yes"]), ColumnType::Text);
        assert_eq!(infer(&["inf", "1"]), ColumnType::Text);
        assert_eq!(infer(&["", "NA"]), ColumnType::Text);
    }

    #[test]
    fn test_render_matches_csv_conventions() {
        assert_eq!(Value::Float(1.0).render(), "1.0");
        assert_eq!(Value::Float(2.5).render(), "2.5");
        assert_eq!(Value::Integer(7).render(), "7");
        assert_eq!(Value::Boolean(true).render(), "True");
        assert_eq!(Value::Null.render(), "");
    }

    #[test]
    fn test_parse_by_column_type() {
        assert_eq!(ColumnType::Integer.parse("007"), Value::Integer(7));
        assert_eq!(ColumnType::Float.parse("3"), Value::Float(3.0));
        assert_eq!(ColumnType::Boolean.parse("FALSE"), Value::Boolean(false));
        assert_eq!(ColumnType::Text.parse("N/A"), Value::Null);
        assert_eq!(
            ColumnType::Text.parse("Bangkok"),
            Value::Text("Bangkok".into())
        );
    }

    #[test]
    fn test_group_key_separates_null() {
        assert_eq!(Value::Null.group_key(), None);
        assert_eq!(Value::Text("A".into()).group_key(), Some("A".into()));
        assert_eq!(Value::Float(1.0).group_key(), Some("1.0".into()));
    }

    #[test]
    fn test_negative_zero_shares_the_zero_group() {
        assert_eq!(Value::Float(-0.0).group_key(), Value::Float(0.0).group_key());
        assert_eq!(Value::Float(-0.0).group_key(), Some("0.0".into()));
        assert_eq!(Value::Float(-1.5).group_key(), Some("-1.5".into()));
    }
}
