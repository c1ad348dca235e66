//! Error types for the PostgreSQL stores.

use thiserror::Error;

/// Errors raised by [`crate::PostgresStore`].
#[derive(Error, Debug)]
pub enum PostgresStoreError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// A row that does not decode into a workload record.
    #[error("Invalid row in {table}: {reason}")]
    InvalidRow { table: &'static str, reason: String },
}
