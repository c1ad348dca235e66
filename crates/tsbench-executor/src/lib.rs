//! Executor contract and parallel workload engine for tsbench.
//!
//! An [`Executor`] drives one backend through the benchmark protocol:
//!
//! ```text
//! prepare()                      create tables, top up Users/Devices/Events
//!   └─ run(case)
//!        ├─ prepare()            if options.run_schema_setup
//!        ├─ <case>_prepare       optional hook
//!        ├─ body                 timed (user / system / total / wall)
//!        ├─ <case>_teardown      optional hook, always runs
//!        └─ teardown()           if options.run_schema_teardown, always runs
//! teardown()                     drop tables
//! ```
//!
//! Everything backend-specific sits behind the [`Store`] trait; the
//! executor, its case table and the parallel coordinator are shared by all
//! backends.

pub mod cases;
pub mod error;
pub mod executor;
pub mod memory;
pub mod parallel;
pub mod store;
pub mod workload;

pub use cases::{builtin_cases, CaseDefinition, CaseFn, CaseFuture};
pub use error::{ExecutorError, StoreError, TaskFailure, WorkloadFailures};
pub use executor::Executor;
pub use memory::InMemoryStore;
pub use parallel::{join_cohorts, Cohort, CohortSummary, Role, TaskStep};
pub use store::Store;
pub use workload::{Workload, CASE_STREAM, PREFILL_STREAM, SETUP_STREAM};
