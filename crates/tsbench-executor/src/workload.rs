//! Record generation bound to a store.

use crate::error::StoreError;
use crate::store::Store;
use std::sync::Arc;
use tracing::{debug, info};
use tsbench_core::{Event, KeySelection, RecordCounts, Table};
use tsbench_generator::RecordFactory;

/// Rows per INSERT when topping up a relation.
pub const BATCH_SIZE: usize = 1_000;

/// Factory stream feeding `prepare()`.
pub const SETUP_STREAM: u64 = 0;
/// Factory stream feeding the timed sequential case bodies.
pub const CASE_STREAM: u64 = 1;
/// Factory stream feeding the Events resize before sized cases.
pub const PREFILL_STREAM: u64 = 2;

/// A store together with the record factory and key selection strategy
/// used to feed it.
///
/// Cheap to clone: parallel workload tasks each take their own copy and
/// their own [`RecordFactory`] stream.
#[derive(Clone)]
pub struct Workload {
    store: Arc<dyn Store>,
    key_selection: KeySelection,
    factory: RecordFactory,
}

impl Workload {
    /// Bind a store. Without an explicit `key_selection` the store's default
    /// is used.
    pub fn new(store: Arc<dyn Store>, key_selection: Option<KeySelection>, seed: u64) -> Self {
        let key_selection = key_selection.unwrap_or_else(|| store.default_key_selection());
        Self {
            store,
            key_selection,
            factory: RecordFactory::new(seed),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn key_selection(&self) -> KeySelection {
        self.key_selection
    }

    /// An independent factory for stream `stream`.
    pub fn factory(&self, stream: u64) -> RecordFactory {
        self.factory.fork(stream)
    }

    /// Pick a random id of `parent` according to the key selection strategy.
    pub async fn parent_key(
        &self,
        factory: &mut RecordFactory,
        parent: Table,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self.parent_keys(factory, parent, 1).await?.pop().flatten())
    }

    /// Pick `count` random ids of `parent`.
    async fn parent_keys(
        &self,
        factory: &mut RecordFactory,
        parent: Table,
        count: usize,
    ) -> Result<Vec<Option<i64>>, StoreError> {
        match self.key_selection {
            KeySelection::Uniform => {
                let range = self.store.id_range(parent).await?;
                Ok((0..count)
                    .map(|_| range.map(|r| factory.pick_uniform(r)))
                    .collect())
            }
            KeySelection::EngineRandom => {
                let mut keys = Vec::with_capacity(count);
                for _ in 0..count {
                    keys.push(self.store.random_id(parent).await?);
                }
                Ok(keys)
            }
        }
    }

    /// Build a random event referencing a random device.
    pub async fn random_event(&self, factory: &mut RecordFactory) -> Result<Event, StoreError> {
        let created_at = factory.random_timestamp();
        let device_id = self.parent_key(factory, Table::Devices).await?;
        Ok(factory.event(device_id, created_at))
    }

    /// Generate and insert one random event.
    pub async fn insert_random_event(&self, factory: &mut RecordFactory) -> Result<(), StoreError> {
        let event = self.random_event(factory).await?;
        self.store.insert_event(&event).await
    }

    /// Insert the missing rows so every relation holds at least the
    /// requested number of rows. Parents are filled before children.
    pub async fn ensure_rows(&self, counts: &RecordCounts) -> Result<(), StoreError> {
        let mut factory = self.factory(SETUP_STREAM);
        for (table, target) in [
            (Table::Users, counts.users),
            (Table::Devices, counts.devices),
            (Table::Events, counts.events),
        ] {
            self.top_up(&mut factory, table, target).await?;
        }
        Ok(())
    }

    /// Make the events relation hold exactly `target` rows.
    pub async fn resize_events(&self, target: u64) -> Result<(), StoreError> {
        let current = self.store.count(Table::Events).await?;
        if current > target {
            info!(
                "Truncating {} events to refill to {}",
                current, target
            );
            self.store.truncate(Table::Events).await?;
        }
        let mut factory = self.factory(PREFILL_STREAM);
        self.top_up(&mut factory, Table::Events, target).await?;
        Ok(())
    }

    /// Insert `target - count` rows into `table` when it is short.
    async fn top_up(
        &self,
        factory: &mut RecordFactory,
        table: Table,
        target: u64,
    ) -> Result<u64, StoreError> {
        let current = self.store.count(table).await?;
        if current >= target {
            debug!("{} already holds {} rows (wanted {})", table, current, target);
            return Ok(0);
        }

        let mut remaining = target - current;
        info!(
            "Inserting {} rows into {} ({} present, {} wanted)",
            remaining, table, current, target
        );

        let mut inserted = 0;
        while remaining > 0 {
            let batch = std::cmp::min(remaining, BATCH_SIZE as u64) as usize;
            inserted += self.insert_batch(factory, table, batch).await?;
            remaining -= batch as u64;
        }
        Ok(inserted)
    }

    async fn insert_batch(
        &self,
        factory: &mut RecordFactory,
        table: Table,
        batch: usize,
    ) -> Result<u64, StoreError> {
        let parents = match table.parent() {
            Some(parent) => self.parent_keys(factory, parent, batch).await?,
            None => vec![None; batch],
        };

        match table {
            Table::Users => {
                let users: Vec<_> = (0..batch)
                    .map(|_| {
                        let created_at = factory.random_timestamp();
                        factory.user(created_at)
                    })
                    .collect();
                self.store.insert_users(&users).await
            }
            Table::Devices => {
                let devices: Vec<_> = parents
                    .into_iter()
                    .map(|user_id| {
                        let created_at = factory.random_timestamp();
                        factory.device(user_id, created_at)
                    })
                    .collect();
                self.store.insert_devices(&devices).await
            }
            Table::Events => {
                let events: Vec<_> = parents
                    .into_iter()
                    .map(|device_id| {
                        let created_at = factory.random_timestamp();
                        factory.event(device_id, created_at)
                    })
                    .collect();
                self.store.insert_events(&events).await
            }
        }
    }
}
