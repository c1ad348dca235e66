//! The executor: schema lifecycle, case table and timing protocol.

use crate::cases::{builtin_cases, CaseDefinition};
use crate::error::ExecutorError;
use crate::store::Store;
use crate::workload::Workload;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tsbench_core::{ExecutorOptions, KeySelection, Measurement, ResultSet, Stopwatch, Table};

/// Drives one backend through the benchmark protocol and collects the
/// resulting measurements.
pub struct Executor {
    name: String,
    workload: Workload,
    options: ExecutorOptions,
    cases: Vec<CaseDefinition>,
    results: ResultSet,
}

impl Executor {
    /// Create an executor over `store` with the built-in cases.
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn Store>,
        key_selection: Option<KeySelection>,
        seed: u64,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            name: name.into(),
            workload: Workload::new(store, key_selection, seed),
            options,
            cases: builtin_cases(),
            results: ResultSet::new(),
        }
    }

    /// Add a case, replacing any case with the same name.
    pub fn with_case(mut self, case: CaseDefinition) -> Self {
        self.register_case(case);
        self
    }

    /// Add a case, replacing any case with the same name.
    pub fn register_case(&mut self, case: CaseDefinition) {
        match self.cases.iter_mut().find(|c| c.name == case.name) {
            Some(existing) => *existing = case,
            None => self.cases.push(case),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ExecutorOptions {
        &mut self.options
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Names of every supported case, in registration order.
    pub fn case_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cases.iter().map(|c| c.name)
    }

    pub fn supports(&self, case_name: &str) -> bool {
        self.case(case_name).is_some()
    }

    fn case(&self, case_name: &str) -> Option<CaseDefinition> {
        self.cases.iter().find(|c| c.name == case_name).copied()
    }

    // ========================================================================
    // Schema lifecycle
    // ========================================================================

    /// Create the relations if absent and top them up to the configured row
    /// counts. Calling it again once the counts are met inserts nothing.
    pub async fn prepare(&self) -> Result<(), ExecutorError> {
        let store = self.workload.store();
        debug!("Preparing {} schema", self.name);
        store.create_tables().await?;
        self.workload.ensure_rows(&self.options.records).await?;
        for table in Table::ALL {
            debug!("{}: {} rows", table, store.count(table).await?);
        }
        Ok(())
    }

    /// Drop the relations if present.
    pub async fn teardown(&self) -> Result<(), ExecutorError> {
        debug!("Tearing down {} schema", self.name);
        self.workload.store().drop_tables().await?;
        Ok(())
    }

    // ========================================================================
    // Case execution
    // ========================================================================

    /// Run one case and record its measurement.
    ///
    /// The case teardown hook and, when enabled, the schema teardown run even
    /// if preparing or running the case failed or panicked. The original
    /// failure is what propagates; cleanup failures after it are logged.
    pub async fn run(&mut self, case_name: &str) -> Result<Measurement, ExecutorError> {
        let case = self
            .case(case_name)
            .ok_or_else(|| ExecutorError::UnsupportedCase {
                executor: self.name.clone(),
                case: case_name.to_string(),
            })?;

        info!("Testing {}#{}", self.name, case.name);
        let start = Instant::now();

        let outcome = AssertUnwindSafe(self.measure(case)).catch_unwind().await;
        let cleanup = self.cleanup(case).await;

        info!(
            "Testing {}#{} - took {}s to prepare, test and teardown",
            self.name,
            case.name,
            start.elapsed().as_secs()
        );

        let measurement = match outcome {
            Ok(Ok(measurement)) => {
                cleanup?;
                measurement
            }
            Ok(Err(e)) => {
                if let Err(cleanup_err) = cleanup {
                    error!(
                        "Cleanup after failed case {} also failed: {}",
                        case.name, cleanup_err
                    );
                }
                return Err(e);
            }
            Err(panic) => {
                if let Err(cleanup_err) = cleanup {
                    error!(
                        "Cleanup after panicked case {} also failed: {}",
                        case.name, cleanup_err
                    );
                }
                std::panic::resume_unwind(panic);
            }
        };

        self.results.record(measurement.clone());
        Ok(measurement)
    }

    async fn measure(&self, case: CaseDefinition) -> Result<Measurement, ExecutorError> {
        if self.options.run_schema_setup {
            self.prepare().await?;
        }
        if let Some(hook) = case.prepare {
            hook(self).await?;
        }

        let stopwatch = Stopwatch::start();
        (case.body)(self).await?;
        Ok(stopwatch.stop(case.name))
    }

    async fn cleanup(&self, case: CaseDefinition) -> Result<(), ExecutorError> {
        let hook = match case.teardown {
            Some(hook) => hook(self).await,
            None => Ok(()),
        };
        let schema = if self.options.run_schema_teardown {
            self.teardown().await
        } else {
            Ok(())
        };
        hook.and(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{CaseDefinition, CaseFuture};
    use crate::error::StoreError;
    use crate::memory::InMemoryStore;
    use tsbench_core::RecordCounts;

    fn options() -> ExecutorOptions {
        ExecutorOptions {
            run_schema_setup: false,
            run_schema_teardown: false,
            parallel_readers: 2,
            parallel_writers: 3,
            min_records: 50,
            max_records: 200,
            iterations: 100,
            ..Default::default()
        }
    }

    fn executor(store: &Arc<InMemoryStore>, options: ExecutorOptions) -> Executor {
        Executor::new("memory", store.clone(), None, 42, options)
    }

    fn failing_body(_: &Executor) -> CaseFuture<'_> {
        async { Err(ExecutorError::from(StoreError::new("memory", "disk on fire"))) }.boxed()
    }

    fn panicking_body(executor: &Executor) -> CaseFuture<'_> {
        async move {
            if executor.name() == "memory" {
                panic!("body panicked");
            }
            Ok(())
        }
        .boxed()
    }

    fn truncate_events(executor: &Executor) -> CaseFuture<'_> {
        async move {
            executor.workload().store().truncate(Table::Events).await?;
            Ok(())
        }
        .boxed()
    }

    fn seed_events(executor: &Executor) -> CaseFuture<'_> {
        async move {
            executor.workload().resize_events(10).await?;
            Ok(())
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_unsupported_case() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());

        let err = executor.run("fly_to_the_moon").await.unwrap_err();
        assert!(matches!(err, ExecutorError::UnsupportedCase { .. }));
        assert!(executor.results().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let mut opts = options();
        opts.records = RecordCounts {
            users: 3,
            devices: 7,
            events: 40,
        };
        let executor = executor(&store, opts);

        executor.prepare().await.unwrap();
        let first = store.snapshot().await;
        executor.prepare().await.unwrap();
        let second = store.snapshot().await;

        assert_eq!(first, second);
        assert_eq!(second.events, Some(40));
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let executor = executor(&store, options());

        executor.prepare().await.unwrap();
        executor.teardown().await.unwrap();
        executor.teardown().await.unwrap();
        assert_eq!(store.snapshot().await.tables(), 0);
    }

    #[tokio::test]
    async fn test_bulk_insert_records_measurement() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());
        executor.prepare().await.unwrap();

        let m = executor.run("bulk_insert").await.unwrap();

        assert_eq!(m.case_name, "bulk_insert");
        assert!(m.wall_time >= 0.0 && m.total_time >= 0.0);
        assert_eq!(store.count(Table::Events).await.unwrap(), 100);
        assert_eq!(executor.results().get("bulk_insert").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_cases_insert_monotonic_timestamps() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());
        executor.prepare().await.unwrap();

        executor.run("sequential_ascending_insert").await.unwrap();
        let ascending = store.event_timestamps().await;
        assert_eq!(ascending.len(), 100);
        assert!(ascending.windows(2).all(|w| w[0] < w[1]));

        store.truncate(Table::Events).await.unwrap();
        executor.run("sequential_descending_insert").await.unwrap();
        let descending = store.event_timestamps().await;
        assert!(descending.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn test_per_case_schema_lifecycle() {
        let store = Arc::new(InMemoryStore::new());
        let mut opts = options();
        opts.run_schema_setup = true;
        opts.run_schema_teardown = true;
        let mut executor = executor(&store, opts);

        executor.run("bulk_insert").await.unwrap();

        // Created for the case, dropped afterwards.
        assert_eq!(store.snapshot().await.tables(), 0);
        assert!(executor.results().first("bulk_insert").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_simple_rw_joins_every_task() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());
        executor.prepare().await.unwrap();

        executor.run("parallel_simple_rw").await.unwrap();

        assert_eq!(store.count(Table::Events).await.unwrap(), 3 * 100);
        assert_eq!(store.stats().lookups, 2 * 100);
        assert_eq!(store.stats().aggregations, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_complex_rw_runs_aggregates() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());
        executor.prepare().await.unwrap();

        executor.run("parallel_complex_rw").await.unwrap();

        assert_eq!(store.count(Table::Events).await.unwrap(), 3 * 100);
        assert_eq!(store.stats().aggregations, 2 * 100);
    }

    #[tokio::test]
    async fn test_sized_cases_fill_events_before_timing() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());
        executor.prepare().await.unwrap();

        executor
            .run("parallel_simple_rw_with_max_records")
            .await
            .unwrap();
        assert_eq!(store.count(Table::Events).await.unwrap(), 200 + 3 * 100);

        executor
            .run("parallel_complex_rw_with_min_records")
            .await
            .unwrap();
        assert_eq!(store.count(Table::Events).await.unwrap(), 50 + 3 * 100);
    }

    #[tokio::test]
    async fn test_parallel_failures_surface_after_join() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());
        // No tables: every task fails on its first iteration.

        let err = executor.run("parallel_simple_rw").await.unwrap_err();
        match err {
            ExecutorError::Workload(failures) => {
                assert_eq!(failures.total_tasks, 5);
                assert_eq!(failures.failures.len(), 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(executor.results().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_runs_when_body_fails() {
        let store = Arc::new(InMemoryStore::new());
        let mut opts = options();
        opts.run_schema_setup = true;
        opts.run_schema_teardown = true;
        let mut executor = executor(&store, opts).with_case(
            CaseDefinition::new("doomed", failing_body)
                .with_prepare(seed_events)
                .with_teardown(truncate_events),
        );

        let err = executor.run("doomed").await.unwrap_err();

        assert!(err.to_string().contains("disk on fire"));
        // Global teardown dropped the tables after the case teardown ran.
        assert_eq!(store.snapshot().await.tables(), 0);
        assert_eq!(store.stats().truncations, 1);
        assert!(executor.results().get("doomed").is_none());
    }

    #[tokio::test]
    async fn test_case_teardown_runs_without_global_teardown() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options()).with_case(
            CaseDefinition::new("doomed", failing_body)
                .with_prepare(seed_events)
                .with_teardown(truncate_events),
        );
        executor.prepare().await.unwrap();

        executor.run("doomed").await.unwrap_err();

        assert_eq!(store.count(Table::Events).await.unwrap(), 0);
        assert_eq!(store.snapshot().await.tables(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_runs_when_body_panics() {
        let store = Arc::new(InMemoryStore::new());
        let mut opts = options();
        opts.run_schema_setup = true;
        opts.run_schema_teardown = true;
        let mut executor = executor(&store, opts).with_case(
            CaseDefinition::new("explodes", panicking_body).with_teardown(truncate_events),
        );

        let result = AssertUnwindSafe(executor.run("explodes"))
            .catch_unwind()
            .await;

        assert!(result.is_err());
        assert_eq!(store.stats().truncations, 1);
        assert_eq!(store.snapshot().await.tables(), 0);
    }

    #[tokio::test]
    async fn test_register_case_replaces_by_name() {
        let store = Arc::new(InMemoryStore::new());
        let mut executor = executor(&store, options());
        let before = executor.case_names().count();

        executor.register_case(CaseDefinition::new("bulk_insert", failing_body));

        assert_eq!(executor.case_names().count(), before);
        executor.prepare().await.unwrap();
        assert!(executor.run("bulk_insert").await.is_err());
    }
}
