//! Error types for executors and stores.

use crate::parallel::Role;
use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error raised by a backend store.
///
/// Backend crates keep their own error enums and convert them into this
/// type at the [`crate::Store`] boundary.
#[derive(Error, Debug)]
#[error("{backend} error: {source}")]
pub struct StoreError {
    backend: &'static str,
    source: BoxError,
}

impl StoreError {
    pub fn new(backend: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            backend,
            source: source.into(),
        }
    }

    /// Name of the backend that raised the error.
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Errors surfaced by an executor.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The executor has no case with this name.
    #[error("{executor} doesn't implement test case {case}")]
    UnsupportedCase { executor: String, case: String },

    /// Schema lifecycle or query failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// One or more parallel workload tasks failed.
    #[error(transparent)]
    Workload(#[from] WorkloadFailures),
}

/// A single failed workload task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub role: Role,
    /// Index of the task within its cohort.
    pub index: usize,
    /// Iterations completed before the failure.
    pub completed: u64,
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} after {} iterations: {}",
            self.role, self.index, self.completed, self.message
        )
    }
}

/// All task failures of one parallel case, reported after every task has
/// been joined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} of {} workload tasks failed: {}", .failures.len(), .total_tasks, summarize(.failures))]
pub struct WorkloadFailures {
    pub total_tasks: usize,
    pub failures: Vec<TaskFailure>,
}

fn summarize(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
