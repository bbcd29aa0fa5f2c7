//! Warehouse Error Types

use thiserror::Error;

/// Errors that can occur while talking to the warehouse
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Transport-level failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Login rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Statement rejected or failed during execution
    #[error("An error occurred while executing the query: {message} (code {code})")]
    QueryFailed { code: String, message: String },

    /// Response could not be interpreted
    #[error("Invalid warehouse response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for WarehouseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WarehouseError::Decode(err.to_string())
        } else {
            WarehouseError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WarehouseError {
    fn from(err: serde_json::Error) -> Self {
        WarehouseError::Decode(err.to_string())
    }
}
