//! Backend storage adapter.

use crate::error::StoreError;
use async_trait::async_trait;
use tsbench_core::{Device, Event, KeyRange, KeySelection, Table, User, YearlySummary};

/// The operations an executor needs from a database backend.
///
/// Implementations own their connection pool and must be usable from many
/// tasks at once; the harness adds no locking of its own. DDL and SQL
/// dialect live entirely behind this trait.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name used in logs and errors.
    fn backend(&self) -> &'static str;

    /// Key selection used when the configuration does not choose one.
    fn default_key_selection(&self) -> KeySelection {
        KeySelection::EngineRandom
    }

    /// Create the three relations if they do not exist.
    async fn create_tables(&self) -> Result<(), StoreError>;

    /// Drop the three relations if they exist.
    async fn drop_tables(&self) -> Result<(), StoreError>;

    /// Remove every row from a relation.
    async fn truncate(&self, table: Table) -> Result<(), StoreError>;

    async fn count(&self, table: Table) -> Result<u64, StoreError>;

    /// Batch insert, returning the number of rows written.
    async fn insert_users(&self, users: &[User]) -> Result<u64, StoreError>;

    /// Batch insert, returning the number of rows written.
    async fn insert_devices(&self, devices: &[Device]) -> Result<u64, StoreError>;

    /// Batch insert, returning the number of rows written.
    async fn insert_events(&self, events: &[Event]) -> Result<u64, StoreError>;

    /// Single-row insert used by the timed insert workloads.
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Point lookup: the event with the highest id.
    async fn latest_event(&self) -> Result<Option<Event>, StoreError>;

    /// Yearly aggregate over the events → devices → users join.
    async fn yearly_summary(&self) -> Result<Vec<YearlySummary>, StoreError>;

    /// A random id chosen by the engine, `None` when the table is empty.
    async fn random_id(&self, table: Table) -> Result<Option<i64>, StoreError>;

    /// Smallest and largest id, `None` when the table is empty.
    async fn id_range(&self, table: Table) -> Result<Option<KeyRange>, StoreError>;
}
