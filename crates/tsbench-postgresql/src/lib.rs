//! PostgreSQL and TimescaleDB stores for tsbench.
//!
//! Both backends share one [`PostgresStore`]; the [`Flavor`] decides
//! whether the events table is turned into a TimescaleDB hypertable after
//! creation. Engine-side random ordering (`ORDER BY random()`) is the
//! default key selection.

pub mod error;
pub mod pool;
pub mod sql;
pub mod store;

pub use error::PostgresStoreError;
pub use pool::{ClientPool, DEFAULT_POOL_SIZE};
pub use sql::Flavor;
pub use store::PostgresStore;
