//! Error types for the churn pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, normalizing or slicing customer records.
#[derive(Error, Debug)]
pub enum ChurnError {
    /// The input file could not be opened
    #[error("cannot read input file '{}': {source}", path.display())]
    MissingSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No churn indicator can be derived, or the schema is otherwise unusable
    #[error("schema error: {0}")]
    Schema(String),

    /// A chart asked for an attribute the record set does not carry
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Strict normalization met a churn value it does not recognise
    #[error("invalid churn value {value:?} at row {row}")]
    InvalidChurnValue { row: usize, value: String },

    /// Polars error
    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Chart rendering error
    #[error("render error: {0}")]
    Render(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, ChurnError>;
