//! MariaDB/MySQL store for tsbench.
//!
//! Engine-side random ordering (`ORDER BY RAND()`) is the default key
//! selection.

pub mod error;
pub mod sql;
pub mod store;
pub mod value;

pub use error::MySqlStoreError;
pub use store::{MySqlStore, DEFAULT_POOL_SIZE};
