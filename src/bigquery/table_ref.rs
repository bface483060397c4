//! Destination table identifiers.

use std::fmt;

use serde::Serialize;

use crate::error::AppError;

/// Longest dataset or table id BigQuery accepts, in bytes.
const MAX_ID_BYTES: usize = 1024;

/// A table id as typed by an operator or configured: `dataset.table` or
/// `project.dataset.table`. The project may be domain-scoped
/// (`example.com:project`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    project_id: Option<String>,
    dataset_id: String,
    table_id: String,
}

impl TableRef {
    /// Parses a dotted table id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if the id does not have two or
    /// three parts or any part contains characters BigQuery rejects.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        // Split from the right: a domain-scoped project contains dots.
        let mut parts: Vec<&str> = trimmed.rsplitn(3, '.').collect();
        parts.reverse();

        let (project_id, dataset_id, table_id) = match parts.as_slice() {
            [dataset, table] => (None, *dataset, *table),
            [project, dataset, table] => (Some(*project), *dataset, *table),
            _ => {
                return Err(AppError::InvalidArgument(format!(
                    "Table id '{}' must look like dataset.table or project.dataset.table",
                    trimmed
                )))
            }
        };

        if let Some(project) = project_id {
            validate_project_id(project)?;
        }
        validate_dataset_id(dataset_id)?;
        validate_table_id(table_id)?;

        Ok(Self {
            project_id: project_id.map(String::from),
            dataset_id: dataset_id.to_string(),
            table_id: table_id.to_string(),
        })
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Fills in the project when the id did not name one.
    pub fn qualify(self, default_project: &str) -> QualifiedTable {
        QualifiedTable {
            project_id: self
                .project_id
                .unwrap_or_else(|| default_project.to_string()),
            dataset_id: self.dataset_id,
            table_id: self.table_id,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project_id {
            Some(project) => write!(f, "{}.{}.{}", project, self.dataset_id, self.table_id),
            None => write!(f, "{}.{}", self.dataset_id, self.table_id),
        }
    }
}

/// A fully resolved destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualifiedTable {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

fn validate_project_id(id: &str) -> Result<(), AppError> {
    let valid = match id.split_once(':') {
        Some((domain, project)) => is_domain(domain) && is_plain_project_id(project),
        None => is_plain_project_id(id),
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "'{}' is not a valid project id",
            id
        )))
    }
}

fn is_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}

fn is_plain_project_id(id: &str) -> bool {
    (6..=30).contains(&id.len())
        && id.starts_with(|c: char| c.is_ascii_lowercase())
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn validate_dataset_id(id: &str) -> Result<(), AppError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_BYTES
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "'{}' is not a valid dataset id; use letters, digits and underscores",
            id
        )))
    }
}

fn validate_table_id(id: &str) -> Result<(), AppError> {
    let valid = !id.trim().is_empty()
        && id.len() <= MAX_ID_BYTES
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ' '));
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "'{}' is not a valid table id",
            id
        )))
    }
}
