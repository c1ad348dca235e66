//! ClickHouse store for tsbench.
//!
//! Talks to the HTTP interface (port 8123) with plain POSTed SQL; inserts
//! use `FORMAT JSONEachRow`, scalar reads `FORMAT TabSeparated`.

pub mod error;
pub mod http;
pub mod sql;
pub mod store;

pub use error::ClickHouseStoreError;
pub use http::{parse_connection_url, ClickHouseClient, ConnectionInfo};
pub use store::ClickHouseStore;
