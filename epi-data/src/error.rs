/// Error types for the snapshot and archive views
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpiError {
    /// Required key fields are absent from the table's columns
    #[error("Must have '{}'.", .required.join("', '"))]
    Schema { required: Vec<String> },

    /// A key tuple appears on more than one row
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Malformed window size, fill method, key or column argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Declared operation that has no implementation yet
    #[error("Not yet supported: {0}")]
    Unsupported(&'static str),

    /// A flat-file row carrying more fields than the header names
    #[error("Row {row} has {found} fields, the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Type alias for Results using EpiError
pub type Result<T> = std::result::Result<T, EpiError>;
