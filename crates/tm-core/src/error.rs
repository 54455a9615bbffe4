//! Error types for tm-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tm-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a delimited file
    #[error("failed to parse '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A field could not be decoded with the configured encoding
    #[error("'{path}', record {record}: field is not valid {encoding}")]
    Encoding {
        path: PathBuf,
        record: usize,
        encoding: &'static str,
    },

    /// The join configuration cannot be executed against the given tables
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A range-joined field holds a value that is not numeric
    #[error("type mismatch: {table} table, row {row}, column '{column}': expected a number, found '{value}'")]
    TypeMismatch {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a missing-column configuration error
    pub(crate) fn missing_column(table: &str, column: &str) -> Self {
        Error::Configuration(format!("column '{column}' not found in {table} table"))
    }

    /// True for errors raised while validating the join configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// True when a range-joined field held non-numeric data
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }
}
