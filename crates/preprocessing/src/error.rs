//! Preprocessing Error Types

use thiserror::Error;

/// Errors while building or transforming a dataset
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    /// Column required by the schema is absent from a record
    #[error("Missing column {column} in record {row}")]
    MissingColumn { column: String, row: usize },

    /// Cell could not be interpreted for its column
    #[error("Invalid value {value} for column {column} in record {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// Input width or height does not match what was fitted
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Transform called before fit
    #[error("{0} is not fitted")]
    NotFitted(&'static str),

    /// No rows to fit on
    #[error("Cannot fit {0} on zero rows")]
    EmptyInput(&'static str),
}
