//! tsbench library
//!
//! A benchmark harness that runs the same set of time-series workloads
//! against several database engines and reports CPU and wall-clock time per
//! workload.
//!
//! # Components
//!
//! - [`Registry`] - maps backend identifiers (`postgres`, `timescale_db`,
//!   `maria_db`, `click_house`, `memory`) to executor factories
//! - [`Tester`] - runs one case or a whole configured session against one
//!   backend
//! - [`Reporter`] - renders the collected measurements as a table
//!
//! The executor itself, its test cases and the parallel workload
//! coordinator live in `tsbench_executor`; each backend's store lives in
//! its own crate.
//!
//! # CLI Usage
//!
//! ```bash
//! # Every configured case against every configured database
//! tsbench --config config.yml test-all
//!
//! # Selected cases against one database
//! tsbench test postgres --case bulk_insert --case parallel_simple_rw
//! ```

pub mod registry;
pub mod reporter;
pub mod tester;

pub use registry::{
    BackendKind, DispatchError, ExecutorContext, ExecutorFactory, ExecutorFuture, Registration,
    Registry,
};
pub use reporter::{format_seconds, Reporter, DEFAULT_PRECISION, HEADINGS};
pub use tester::{Tester, TesterError};

use tracing::info;
use tsbench_core::{ResultSet, Settings};

/// Run the configured session against one database.
pub async fn test(
    settings: &Settings,
    registry: &Registry,
    database: &str,
) -> Result<ResultSet, TesterError> {
    let mut tester = Tester::new(settings, registry, database)?;
    info!("Testing {}", tester.display_name());
    Ok(tester.run_all().await?.clone())
}

/// Run the configured session against every configured database, in
/// configuration order.
pub async fn test_all(
    settings: &Settings,
    registry: &Registry,
) -> Result<Vec<(String, ResultSet)>, TesterError> {
    let mut all = Vec::with_capacity(settings.databases.len());
    for database in settings.databases.keys() {
        let results = test(settings, registry, database).await?;
        all.push((database.clone(), results));
    }
    Ok(all)
}
