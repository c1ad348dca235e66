//! Error types for the ClickHouse store.

use thiserror::Error;

/// Errors raised by [`crate::ClickHouseStore`].
#[derive(Error, Debug)]
pub enum ClickHouseStoreError {
    /// Transport error talking to the HTTP interface.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected a query.
    #[error("ClickHouse returned status {status}: {body}")]
    Server { status: u16, body: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A response that does not decode into workload records.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
