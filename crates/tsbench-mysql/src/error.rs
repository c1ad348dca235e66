//! Error types for the MySQL store.

use thiserror::Error;

/// Errors raised by [`crate::MySqlStore`].
#[derive(Error, Debug)]
pub enum MySqlStoreError {
    /// MySQL connection or query error.
    #[error("MySQL error: {0}")]
    MySQL(#[from] mysql_async::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value that does not decode into a workload record field.
    #[error("Invalid value in {table}.{column}: {reason}")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        reason: String,
    },
}
