//! Executor options.

use serde::{Deserialize, Serialize};

/// Iterations each workload task performs unless configured otherwise.
pub const DEFAULT_ITERATIONS: u64 = 10_000;

/// Desired steady-state row counts per relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub devices: u64,
    #[serde(default)]
    pub events: u64,
}

/// Configuration owned by an executor for the duration of one tester
/// invocation.
///
/// `run_schema_setup` / `run_schema_teardown` control whether every single
/// case run prepares and tears down the schema around itself. A full
/// session (`run_all`) switches both off temporarily and performs the
/// lifecycle once around the whole case list instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOptions {
    pub run_schema_setup: bool,
    pub run_schema_teardown: bool,
    pub verbose: bool,
    /// Reader tasks spawned by the parallel cases.
    pub parallel_readers: usize,
    /// Writer tasks spawned by the parallel cases.
    pub parallel_writers: usize,
    /// Events table size for the `*_with_min_records` cases.
    pub min_records: u64,
    /// Events table size for the `*_with_max_records` cases.
    pub max_records: u64,
    /// Rows `prepare()` guarantees per relation.
    pub records: RecordCounts,
    /// Inserts/queries per case body and per parallel task.
    pub iterations: u64,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            run_schema_setup: true,
            run_schema_teardown: true,
            verbose: false,
            parallel_readers: 4,
            parallel_writers: 4,
            min_records: 1_000,
            max_records: 100_000,
            records: RecordCounts::default(),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl ExecutorOptions {
    /// Same options with the per-case schema lifecycle switched off.
    pub fn without_schema_lifecycle(&self) -> Self {
        Self {
            run_schema_setup: false,
            run_schema_teardown: false,
            ..self.clone()
        }
    }
}
