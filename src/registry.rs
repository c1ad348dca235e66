//! Name-based executor dispatch.
//!
//! Every backend identifier maps to a factory that connects to the backend
//! and builds an [`Executor`] around its store. The built-in backends are
//! registered by [`Registry::with_builtin`]; further backends are added with
//! [`Registry::register`] without touching the lookup code. Lookups ignore
//! case and separators, so `TimescaleDb` resolves to `timescale_db`.

use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tsbench_clickhouse::ClickHouseStore;
use tsbench_core::{normalize_backend_name, BackendConfig, ExecutorOptions};
use tsbench_executor::{Executor, ExecutorError, InMemoryStore, Store, StoreError};
use tsbench_generator::DEFAULT_SEED;
use tsbench_mysql::MySqlStore;
use tsbench_postgresql::PostgresStore;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No executor found for database '{0}'")]
    NoExecutorFound(String),
}

/// Everything a factory needs to build an executor.
#[derive(Debug, Clone)]
pub struct ExecutorContext {
    /// Executor name used in logs, normally the configuration key.
    pub name: String,
    pub backend: BackendConfig,
    pub options: ExecutorOptions,
}

impl ExecutorContext {
    /// Wrap a connected store.
    pub fn into_executor(self, store: Arc<dyn Store>) -> Executor {
        Executor::new(
            self.name,
            store,
            self.backend.key_selection,
            self.backend.seed.unwrap_or(DEFAULT_SEED),
            self.options,
        )
    }
}

pub type ExecutorFuture = BoxFuture<'static, Result<Executor, ExecutorError>>;

/// Connects to a backend and builds its executor.
pub type ExecutorFactory = Arc<dyn Fn(ExecutorContext) -> ExecutorFuture + Send + Sync>;

/// The backends shipped with tsbench.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    TimescaleDb,
    MariaDb,
    ClickHouse,
    Memory,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Postgres,
        BackendKind::TimescaleDb,
        BackendKind::MariaDb,
        BackendKind::ClickHouse,
        BackendKind::Memory,
    ];

    /// Identifier used as the configuration key.
    pub fn identifier(self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::TimescaleDb => "timescale_db",
            BackendKind::MariaDb => "maria_db",
            BackendKind::ClickHouse => "click_house",
            BackendKind::Memory => "memory",
        }
    }

    pub fn factory(self) -> ExecutorFactory {
        match self {
            BackendKind::Postgres => Arc::new(connect_postgres),
            BackendKind::TimescaleDb => Arc::new(connect_timescale),
            BackendKind::MariaDb => Arc::new(connect_maria_db),
            BackendKind::ClickHouse => Arc::new(connect_click_house),
            BackendKind::Memory => Arc::new(build_memory),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

fn connect_postgres(ctx: ExecutorContext) -> ExecutorFuture {
    async move {
        let store = PostgresStore::connect(&ctx.backend.url, ctx.backend.pool_size)
            .await
            .map_err(|e| StoreError::new("postgres", e))?;
        Ok(ctx.into_executor(Arc::new(store)))
    }
    .boxed()
}

fn connect_timescale(ctx: ExecutorContext) -> ExecutorFuture {
    async move {
        let store = PostgresStore::connect_timescale(&ctx.backend.url, ctx.backend.pool_size)
            .await
            .map_err(|e| StoreError::new("timescale_db", e))?;
        Ok(ctx.into_executor(Arc::new(store)))
    }
    .boxed()
}

fn connect_maria_db(ctx: ExecutorContext) -> ExecutorFuture {
    async move {
        let store = MySqlStore::connect(&ctx.backend.url, ctx.backend.pool_size)
            .await
            .map_err(|e| StoreError::new("maria_db", e))?;
        Ok(ctx.into_executor(Arc::new(store)))
    }
    .boxed()
}

fn connect_click_house(ctx: ExecutorContext) -> ExecutorFuture {
    async move {
        let store = ClickHouseStore::connect(&ctx.backend.url)
            .await
            .map_err(|e| StoreError::new("click_house", e))?;
        Ok(ctx.into_executor(Arc::new(store)))
    }
    .boxed()
}

fn build_memory(ctx: ExecutorContext) -> ExecutorFuture {
    async move { Ok(ctx.into_executor(Arc::new(InMemoryStore::new()))) }.boxed()
}

/// A resolved backend.
#[derive(Clone)]
pub struct Registration {
    identifier: String,
    factory: ExecutorFactory,
}

impl Registration {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Connect and build the executor.
    pub async fn build(&self, ctx: ExecutorContext) -> Result<Executor, ExecutorError> {
        (self.factory)(ctx).await
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Backend identifier to factory mapping.
#[derive(Default, Clone)]
pub struct Registry {
    entries: IndexMap<String, Registration>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every [`BackendKind`].
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in BackendKind::ALL {
            registry.register(kind.identifier(), kind.factory());
        }
        registry
    }

    /// Add or replace a backend.
    pub fn register(&mut self, identifier: impl Into<String>, factory: ExecutorFactory) {
        let identifier = identifier.into();
        self.entries.insert(
            normalize_backend_name(&identifier),
            Registration {
                identifier,
                factory,
            },
        );
    }

    /// Find the backend registered under `name`, ignoring case.
    pub fn resolve(&self, name: &str) -> Result<Registration, DispatchError> {
        self.entries
            .get(&normalize_backend_name(name))
            .cloned()
            .ok_or_else(|| DispatchError::NoExecutorFound(name.to_string()))
    }

    /// Registered identifiers in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|r| r.identifier.as_str())
    }
}
