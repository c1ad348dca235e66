//! Built-in test cases.
//!
//! Every case is a plain function over the [`Executor`]; optional per-case
//! hooks sit next to it in its [`CaseDefinition`], so whether a hook exists
//! is known when the executor is built.

use crate::error::{ExecutorError, StoreError};
use crate::executor::Executor;
use crate::parallel::{join_cohorts, Cohort, Role, TaskStep};
use crate::workload::{Workload, CASE_STREAM};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;
use tsbench_generator::{RecordFactory, Timeline};

/// Future returned by case bodies and hooks.
pub type CaseFuture<'a> = BoxFuture<'a, Result<(), ExecutorError>>;

/// A case body or hook.
pub type CaseFn = for<'a> fn(&'a Executor) -> CaseFuture<'a>;

/// A named test case and its optional hooks.
#[derive(Clone, Copy)]
pub struct CaseDefinition {
    pub name: &'static str,
    pub body: CaseFn,
    /// Runs before the timed body, outside the measurement.
    pub prepare: Option<CaseFn>,
    /// Runs after the body even when it failed.
    pub teardown: Option<CaseFn>,
}

impl CaseDefinition {
    pub fn new(name: &'static str, body: CaseFn) -> Self {
        Self {
            name,
            body,
            prepare: None,
            teardown: None,
        }
    }

    pub fn with_prepare(mut self, hook: CaseFn) -> Self {
        self.prepare = Some(hook);
        self
    }

    pub fn with_teardown(mut self, hook: CaseFn) -> Self {
        self.teardown = Some(hook);
        self
    }
}

impl std::fmt::Debug for CaseDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseDefinition")
            .field("name", &self.name)
            .field("prepare", &self.prepare.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// The cases every executor supports.
pub fn builtin_cases() -> Vec<CaseDefinition> {
    vec![
        CaseDefinition::new("bulk_insert", bulk_insert),
        CaseDefinition::new("sequential_ascending_insert", sequential_ascending_insert),
        CaseDefinition::new("sequential_descending_insert", sequential_descending_insert),
        CaseDefinition::new("parallel_simple_rw", parallel_simple_rw),
        CaseDefinition::new("parallel_simple_rw_with_min_records", parallel_simple_rw)
            .with_prepare(fill_to_min_records),
        CaseDefinition::new("parallel_simple_rw_with_max_records", parallel_simple_rw)
            .with_prepare(fill_to_max_records),
        CaseDefinition::new("parallel_complex_rw", parallel_complex_rw),
        CaseDefinition::new("parallel_complex_rw_with_min_records", parallel_complex_rw)
            .with_prepare(fill_to_min_records),
        CaseDefinition::new("parallel_complex_rw_with_max_records", parallel_complex_rw)
            .with_prepare(fill_to_max_records),
    ]
}

// ============================================================================
// Sequential inserts
// ============================================================================

fn bulk_insert(executor: &Executor) -> CaseFuture<'_> {
    async move {
        let workload = executor.workload();
        let mut factory = workload.factory(CASE_STREAM);
        for _ in 0..executor.options().iterations {
            workload.insert_random_event(&mut factory).await?;
        }
        Ok(())
    }
    .boxed()
}

fn sequential_ascending_insert(executor: &Executor) -> CaseFuture<'_> {
    insert_along(executor, Timeline::ascending(Utc::now())).boxed()
}

fn sequential_descending_insert(executor: &Executor) -> CaseFuture<'_> {
    insert_along(executor, Timeline::descending(Utc::now())).boxed()
}

async fn insert_along(executor: &Executor, timeline: Timeline) -> Result<(), ExecutorError> {
    let workload = executor.workload();
    let mut factory = workload.factory(CASE_STREAM);
    for created_at in timeline.take(executor.options().iterations as usize) {
        let mut event = workload.random_event(&mut factory).await?;
        event.created_at = created_at;
        workload.store().insert_event(&event).await?;
    }
    Ok(())
}

// ============================================================================
// Parallel reads and writes
// ============================================================================

/// What reader tasks do on every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadKind {
    /// Latest event by descending id.
    PointLookup,
    /// Yearly sum/count aggregate across the three-table join.
    Aggregate,
}

const WRITER_STREAM_BASE: u64 = 1_000;

struct WriterStep {
    workload: Workload,
    factory: RecordFactory,
}

#[async_trait]
impl TaskStep for WriterStep {
    async fn step(&mut self) -> Result<(), StoreError> {
        self.workload.insert_random_event(&mut self.factory).await
    }
}

struct ReaderStep {
    workload: Workload,
    kind: ReadKind,
}

#[async_trait]
impl TaskStep for ReaderStep {
    async fn step(&mut self) -> Result<(), StoreError> {
        match self.kind {
            ReadKind::PointLookup => {
                self.workload.store().latest_event().await?;
            }
            ReadKind::Aggregate => {
                self.workload.store().yearly_summary().await?;
            }
        }
        Ok(())
    }
}

fn parallel_simple_rw(executor: &Executor) -> CaseFuture<'_> {
    parallel_reads_and_writes(executor, ReadKind::PointLookup).boxed()
}

fn parallel_complex_rw(executor: &Executor) -> CaseFuture<'_> {
    parallel_reads_and_writes(executor, ReadKind::Aggregate).boxed()
}

async fn parallel_reads_and_writes(
    executor: &Executor,
    kind: ReadKind,
) -> Result<(), ExecutorError> {
    let options = executor.options();
    let workload = executor.workload();

    let writers = Cohort::new(
        Role::Writer,
        options.parallel_writers,
        options.iterations,
        |index| {
            Box::new(WriterStep {
                workload: workload.clone(),
                factory: workload.factory(WRITER_STREAM_BASE + index as u64),
            })
        },
    );
    let readers = Cohort::new(
        Role::Reader,
        options.parallel_readers,
        options.iterations,
        |_| {
            Box::new(ReaderStep {
                workload: workload.clone(),
                kind,
            })
        },
    );

    let summary = join_cohorts(vec![writers, readers]).await?;
    debug!(
        "{} tasks joined: {} writes, {} reads",
        summary.tasks, summary.writer_iterations, summary.reader_iterations
    );
    Ok(())
}

// ============================================================================
// Hooks
// ============================================================================

fn fill_to_min_records(executor: &Executor) -> CaseFuture<'_> {
    async move {
        executor
            .workload()
            .resize_events(executor.options().min_records)
            .await?;
        Ok(())
    }
    .boxed()
}

fn fill_to_max_records(executor: &Executor) -> CaseFuture<'_> {
    async move {
        executor
            .workload()
            .resize_events(executor.options().max_records)
            .await?;
        Ok(())
    }
    .boxed()
}
