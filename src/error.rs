//! Error types.
//!
//! - `RecordError`: a raw record that cannot be normalized and is excluded
//! - `FieldWarning`: a recoverable problem with one field of a kept record
//! - `SourceError`: failures while obtaining the raw payload

use serde::Serialize;
use thiserror::Error;

/// Reasons a raw record is excluded from a collection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    #[error("record #{index} has no identifier")]
    MissingIdentifier { index: usize },

    #[error("record #{index} repeats identifier `{id}`")]
    DuplicateIdentifier { index: usize, id: String },

    #[error("record #{index} is not an object")]
    NotAnObject { index: usize },
}

impl RecordError {
    /// Position of the offending record in the raw payload.
    #[cfg(test)]
    pub fn index(&self) -> usize {
        match self {
            RecordError::MissingIdentifier { index }
            | RecordError::DuplicateIdentifier { index, .. }
            | RecordError::NotAnObject { index } => *index,
        }
    }
}

/// Field problems that were recovered by defaulting the value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldWarning {
    #[error("project `{id}`: field `{field}` is not a number ({raw}), using 0")]
    MalformedNumeric {
        id: String,
        field: String,
        raw: String,
    },
}

/// Errors while loading the raw project payload.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected payload shape: {0}")]
    Shape(String),
}
