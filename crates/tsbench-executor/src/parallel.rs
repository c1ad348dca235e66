//! Fan-out/fan-in coordination of parallel reader and writer tasks.
//!
//! A [`Cohort`] is a fixed number of tasks of one [`Role`], each looping a
//! fixed number of iterations of its own [`TaskStep`]. [`join_cohorts`]
//! spawns every task of every cohort, then waits for all of them. Tasks do
//! not talk to each other; the only shared resource is whatever their steps
//! hold (in practice the store's connection pool).
//!
//! There is no cancellation and no timeout: a stuck task stalls the join.
//! A task stops at its own first error, the others keep going, and all
//! failures (errors and panics alike) are reported together once every task
//! has finished.

use crate::error::{StoreError, TaskFailure, WorkloadFailures};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::task::{self, JoinSet};
use tracing::{debug, warn};

/// What a task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Writer,
    Reader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => write!(f, "writer"),
            Role::Reader => write!(f, "reader"),
        }
    }
}

/// One iteration of a task's loop.
#[async_trait]
pub trait TaskStep: Send + 'static {
    async fn step(&mut self) -> Result<(), StoreError>;
}

/// A group of identical tasks.
pub struct Cohort {
    role: Role,
    iterations: u64,
    steps: Vec<Box<dyn TaskStep>>,
}

impl Cohort {
    /// Build `tasks` tasks of `role`; `make_step` receives the task index.
    pub fn new<F>(role: Role, tasks: usize, iterations: u64, mut make_step: F) -> Self
    where
        F: FnMut(usize) -> Box<dyn TaskStep>,
    {
        Self {
            role,
            iterations,
            steps: (0..tasks).map(&mut make_step).collect(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// What a successful join observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CohortSummary {
    pub tasks: usize,
    pub writer_iterations: u64,
    pub reader_iterations: u64,
}

struct TaskOutcome {
    role: Role,
    index: usize,
    completed: u64,
    error: Option<String>,
}

/// Spawn every task of every cohort and wait until all have terminated.
pub async fn join_cohorts(cohorts: Vec<Cohort>) -> Result<CohortSummary, WorkloadFailures> {
    let mut joins = JoinSet::new();
    let mut spawned: HashMap<task::Id, (Role, usize)> = HashMap::new();
    let mut total_tasks = 0;

    for cohort in cohorts {
        debug!(
            "Spawning {} {} tasks x {} iterations",
            cohort.len(),
            cohort.role,
            cohort.iterations
        );
        for (index, step) in cohort.steps.into_iter().enumerate() {
            total_tasks += 1;
            let handle = joins.spawn(run_task(cohort.role, index, cohort.iterations, step));
            spawned.insert(handle.id(), (cohort.role, index));
        }
    }

    let mut summary = CohortSummary {
        tasks: total_tasks,
        ..Default::default()
    };
    let mut failures = Vec::new();

    while let Some(joined) = joins.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                // Panics inside a step are caught by the task itself, so
                // this only sees tasks that died outside their loop.
                let Some(&(role, index)) = spawned.get(&e.id()) else {
                    warn!("Unknown workload task {} failed: {}", e.id(), e);
                    continue;
                };
                warn!("{} #{} terminated abnormally: {}", role, index, e);
                failures.push(TaskFailure {
                    role,
                    index,
                    completed: 0,
                    message: format!("join error: {e}"),
                });
                continue;
            }
        };

        match outcome.role {
            Role::Writer => summary.writer_iterations += outcome.completed,
            Role::Reader => summary.reader_iterations += outcome.completed,
        }

        if let Some(message) = outcome.error {
            warn!(
                "{} #{} failed after {} iterations: {}",
                outcome.role, outcome.index, outcome.completed, message
            );
            failures.push(TaskFailure {
                role: outcome.role,
                index: outcome.index,
                completed: outcome.completed,
                message,
            });
        }
    }

    if failures.is_empty() {
        Ok(summary)
    } else {
        failures.sort_by_key(|f| (f.role == Role::Reader, f.index));
        Err(WorkloadFailures {
            total_tasks,
            failures,
        })
    }
}

async fn run_task(
    role: Role,
    index: usize,
    iterations: u64,
    mut step: Box<dyn TaskStep>,
) -> TaskOutcome {
    let mut completed = 0u64;

    let result = AssertUnwindSafe(async {
        while completed < iterations {
            step.step().await?;
            completed += 1;
        }
        Ok::<(), StoreError>(())
    })
    .catch_unwind()
    .await;

    let error = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
    };

    TaskOutcome {
        role,
        index,
        completed,
        error,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicU64>);

    #[async_trait]
    impl TaskStep for Counting {
        async fn step(&mut self) -> Result<(), StoreError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(())
        }
    }

    struct FailAt {
        at: u64,
        seen: u64,
    }

    #[async_trait]
    impl TaskStep for FailAt {
        async fn step(&mut self) -> Result<(), StoreError> {
            self.seen += 1;
            if self.seen == self.at {
                return Err(StoreError::new("test", "connection reset"));
            }
            Ok(())
        }
    }

    struct Panics;

    #[async_trait]
    impl TaskStep for Panics {
        async fn step(&mut self) -> Result<(), StoreError> {
            panic!("reader blew up");
        }
    }

    /// Finishes its loop, then panics while the task releases it.
    struct PanicsOnDrop {
        armed: bool,
    }

    #[async_trait]
    impl TaskStep for PanicsOnDrop {
        async fn step(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    impl Drop for PanicsOnDrop {
        fn drop(&mut self) {
            if self.armed {
                panic!("release failed");
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_join_completeness() {
        let readers = 3;
        let writers = 2;
        let reads = Arc::new(AtomicU64::new(0));
        let writes = Arc::new(AtomicU64::new(0));

        let summary = join_cohorts(vec![
            Cohort::new(Role::Writer, writers, 10_000, |_| {
                Box::new(Counting(writes.clone()))
            }),
            Cohort::new(Role::Reader, readers, 10_000, |_| {
                Box::new(Counting(reads.clone()))
            }),
        ])
        .await
        .unwrap();

        assert_eq!(writes.load(Ordering::SeqCst), writers as u64 * 10_000);
        assert_eq!(reads.load(Ordering::SeqCst), readers as u64 * 10_000);
        assert_eq!(summary.tasks, readers + writers);
        assert_eq!(summary.writer_iterations, 20_000);
        assert_eq!(summary.reader_iterations, 30_000);
    }

    #[tokio::test]
    async fn test_empty_cohorts_complete_immediately() {
        let summary = join_cohorts(vec![
            Cohort::new(Role::Writer, 0, 10, |_| Box::new(FailAt { at: 1, seen: 0 })),
            Cohort::new(Role::Reader, 0, 10, |_| Box::new(FailAt { at: 1, seen: 0 })),
        ])
        .await
        .unwrap();

        assert_eq!(summary, CohortSummary::default());
    }

    #[tokio::test]
    async fn test_failures_are_aggregated_after_join() {
        let writes = Arc::new(AtomicU64::new(0));

        let err = join_cohorts(vec![
            Cohort::new(Role::Writer, 2, 1_000, |_| Box::new(Counting(writes.clone()))),
            Cohort::new(Role::Reader, 2, 1_000, |i| {
                Box::new(FailAt {
                    at: 10 * (i as u64 + 1),
                    seen: 0,
                })
            }),
        ])
        .await
        .unwrap_err();

        // Healthy tasks ran to completion despite the failures.
        assert_eq!(writes.load(Ordering::SeqCst), 2_000);
        assert_eq!(err.total_tasks, 4);
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.failures[0].role, Role::Reader);
        assert_eq!(err.failures[0].index, 0);
        assert_eq!(err.failures[0].completed, 9);
        assert_eq!(err.failures[1].completed, 19);
        assert!(err.failures[0].message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_panics_are_reported_as_failures() {
        let writes = Arc::new(AtomicU64::new(0));

        let err = join_cohorts(vec![
            Cohort::new(Role::Writer, 1, 100, |_| Box::new(Counting(writes.clone()))),
            Cohort::new(Role::Reader, 1, 100, |_| Box::new(Panics)),
        ])
        .await
        .unwrap_err();

        assert_eq!(writes.load(Ordering::SeqCst), 100);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].role, Role::Reader);
        assert_eq!(err.failures[0].message, "panicked: reader blew up");
    }

    #[tokio::test]
    async fn test_abnormal_termination_keeps_task_identity() {
        let err = join_cohorts(vec![
            Cohort::new(Role::Writer, 2, 10, |_| Box::new(PanicsOnDrop { armed: false })),
            Cohort::new(Role::Reader, 3, 10, |i| Box::new(PanicsOnDrop { armed: i == 2 })),
        ])
        .await
        .unwrap_err();

        assert_eq!(err.total_tasks, 5);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].role, Role::Reader);
        assert_eq!(err.failures[0].index, 2);
        assert!(err.failures[0].message.starts_with("join error"));
        assert!(!err.to_string().contains(&usize::MAX.to_string()));
    }
}
