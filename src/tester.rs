//! Orchestration of test sessions against one backend.

use crate::registry::{DispatchError, ExecutorContext, Registration, Registry};
use crate::reporter::Reporter;
use thiserror::Error;
use tracing::{debug, info};
use tsbench_core::{BackendConfig, ExecutorOptions, Measurement, ResultSet, Settings};
use tsbench_executor::{Executor, ExecutorError};

#[derive(Debug, Error)]
pub enum TesterError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Runs test cases against one backend and reports the results.
///
/// The backend is resolved when the tester is created, but the executor
/// (and so the database connection) is only built on the first run and is
/// then reused for the rest of the session.
pub struct Tester {
    database: String,
    registration: Registration,
    backend: BackendConfig,
    options: ExecutorOptions,
    test_cases: Vec<String>,
    reporter: Reporter,
    executor: Option<Executor>,
}

impl Tester {
    /// Resolve `database` against `registry`.
    ///
    /// Fails with [`DispatchError::NoExecutorFound`] when no backend is
    /// registered under that name. A registered backend missing from
    /// `settings.databases` gets default connection parameters.
    pub fn new(settings: &Settings, registry: &Registry, database: &str) -> Result<Self, TesterError> {
        let registration = registry.resolve(database)?;
        let (database, backend) = match settings.backend(database) {
            Some((key, backend)) => (key.to_string(), backend.clone()),
            None => (database.to_string(), BackendConfig::default()),
        };

        Ok(Self {
            database,
            registration,
            backend,
            options: settings.executor_options(),
            test_cases: settings.test_cases.clone(),
            reporter: Reporter::new(settings.float_precision),
            executor: None,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Heading printed above the report.
    pub fn display_name(&self) -> &str {
        self.backend
            .display_name
            .as_deref()
            .unwrap_or(&self.database)
    }

    pub fn options(&self) -> &ExecutorOptions {
        match &self.executor {
            Some(executor) => executor.options(),
            None => &self.options,
        }
    }

    pub fn options_mut(&mut self) -> &mut ExecutorOptions {
        match &mut self.executor {
            Some(executor) => executor.options_mut(),
            None => &mut self.options,
        }
    }

    /// Override the configured case list used by [`Tester::run_all`].
    pub fn set_test_cases(&mut self, test_cases: Vec<String>) {
        self.test_cases = test_cases;
    }

    pub fn set_precision(&mut self, precision: usize) {
        self.reporter = Reporter::new(precision);
    }

    /// Measurements collected so far.
    pub fn results(&self) -> Option<&ResultSet> {
        self.executor.as_ref().map(Executor::results)
    }

    /// The rendered report for everything collected so far.
    pub fn report(&self) -> String {
        let empty = ResultSet::new();
        self.reporter
            .render(self.display_name(), self.results().unwrap_or(&empty))
    }

    async fn executor(&mut self) -> Result<&mut Executor, TesterError> {
        let executor = match self.executor.take() {
            Some(executor) => executor,
            None => {
                debug!(
                    "Building {} executor for {}",
                    self.registration.identifier(),
                    self.database
                );
                self.registration
                    .build(ExecutorContext {
                        name: self.database.clone(),
                        backend: self.backend.clone(),
                        options: self.options.clone(),
                    })
                    .await?
            }
        };
        Ok(self.executor.insert(executor))
    }

    /// Run one case and optionally print the report.
    pub async fn run(&mut self, case_name: &str, print_result: bool) -> Result<Measurement, TesterError> {
        let case_name = case_name.to_lowercase();
        let measurement = self.executor().await?.run(&case_name).await?;
        if print_result {
            println!("{}", self.report());
        }
        Ok(measurement)
    }

    /// Run every configured case in order with one schema setup and one
    /// teardown around the whole session, then print the report.
    ///
    /// Options are restored afterwards whether or not a case failed. A
    /// failing case aborts the session before the final teardown.
    pub async fn run_all(&mut self) -> Result<&ResultSet, TesterError> {
        let test_cases: Vec<String> = self.test_cases.iter().map(|c| c.to_lowercase()).collect();
        let title = self.display_name().to_string();
        let reporter = self.reporter;
        let executor = self.executor().await?;

        let saved = executor.options().clone();
        *executor.options_mut() = saved.without_schema_lifecycle();
        let outcome = run_suite(executor, &saved, &test_cases).await;
        *executor.options_mut() = saved;
        outcome?;

        println!("{}", reporter.render(&title, executor.results()));
        Ok(executor.results())
    }
}

async fn run_suite(
    executor: &mut Executor,
    options: &ExecutorOptions,
    test_cases: &[String],
) -> Result<(), ExecutorError> {
    if options.run_schema_setup {
        executor.prepare().await?;
    }

    for case_name in test_cases {
        let measurement = executor.run(case_name).await?;
        if options.verbose {
            info!(
                "{}#{}: {:.6}s wall, {:.6}s cpu",
                executor.name(),
                case_name,
                measurement.wall_time,
                measurement.total_time
            );
        } else {
            debug!("{}#{} done", executor.name(), case_name);
        }
    }

    if options.run_schema_teardown {
        executor.teardown().await?;
    }
    Ok(())
}
