//! Core types for the tsbench framework.
//!
//! This crate provides the foundational types shared by every tsbench
//! crate:
//!
//! - [`User`], [`Device`], [`Event`] - The workload records (Users → Devices → Events)
//! - [`Measurement`] and [`ResultSet`] - Timing samples collected per test case
//! - [`Stopwatch`] - CPU (user/system) and wall-clock timing of a region
//! - [`ExecutorOptions`] - Per-invocation executor configuration
//! - [`Settings`] - Harness configuration loaded from YAML
//!
//! # Architecture
//!
//! ```text
//! tsbench-core (this crate)
//!    │
//!    ├─── tsbench-generator   (record factory, key selection)
//!    │
//!    ├─── tsbench-executor    (executor contract, parallel workloads)
//!    │
//!    ├─── tsbench-postgresql  (PostgreSQL / TimescaleDB stores)
//!    ├─── tsbench-mysql       (MariaDB / MySQL store)
//!    └─── tsbench-clickhouse  (ClickHouse store)
//! ```

pub mod config;
pub mod logging;
pub mod measurement;
pub mod options;
pub mod records;

// Re-exports for convenience
pub use config::{normalize_backend_name, BackendConfig, ConfigError, Settings};
pub use logging::mask_connection_password;
pub use measurement::{CpuTimes, Measurement, ResultSet, Stopwatch};
pub use options::{ExecutorOptions, RecordCounts};
pub use records::{
    Action, Device, Event, KeyRange, KeySelection, ParseActionError, Table, User, YearlySummary,
};
