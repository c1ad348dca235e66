//! A [`Store`] kept entirely in process memory.
//!
//! Used by the test suites and as the `memory` backend for dry runs of the
//! harness itself. It follows the same rules as the SQL stores: inserting
//! into or querying a relation that does not exist is an error, ids are
//! assigned by the store and never reused until the relation is dropped.

use crate::error::StoreError;
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tsbench_core::{Device, Event, KeyRange, KeySelection, Table, User, YearlySummary};

const BACKEND: &str = "memory";

#[derive(Debug, Error)]
enum MemoryStoreError {
    #[error("relation \"{0}\" does not exist")]
    MissingTable(Table),
}

impl From<MemoryStoreError> for StoreError {
    fn from(err: MemoryStoreError) -> Self {
        StoreError::new(BACKEND, err)
    }
}

#[derive(Default)]
struct Tables {
    users: Option<Vec<User>>,
    devices: Option<Vec<Device>>,
    events: Option<Vec<Event>>,
    next_ids: [i64; 3],
}

impl Tables {
    fn ids(&self, table: Table) -> Result<Vec<i64>, MemoryStoreError> {
        let missing = || MemoryStoreError::MissingTable(table);
        Ok(match table {
            Table::Users => self.users.as_ref().ok_or_else(missing)?.iter().filter_map(|r| r.id).collect(),
            Table::Devices => self.devices.as_ref().ok_or_else(missing)?.iter().filter_map(|r| r.id).collect(),
            Table::Events => self.events.as_ref().ok_or_else(missing)?.iter().filter_map(|r| r.id).collect(),
        })
    }

    fn next_id(&mut self, table: Table) -> i64 {
        let slot = &mut self.next_ids[slot(table)];
        *slot += 1;
        *slot
    }

    fn len(&self, table: Table) -> Option<u64> {
        match table {
            Table::Users => self.users.as_ref().map(|r| r.len() as u64),
            Table::Devices => self.devices.as_ref().map(|r| r.len() as u64),
            Table::Events => self.events.as_ref().map(|r| r.len() as u64),
        }
    }
}

fn slot(table: Table) -> usize {
    match table {
        Table::Users => 0,
        Table::Devices => 1,
        Table::Events => 2,
    }
}

/// Row counts per relation, `None` for a relation that does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub users: Option<u64>,
    pub devices: Option<u64>,
    pub events: Option<u64>,
}

impl MemorySnapshot {
    /// Number of existing relations.
    pub fn tables(&self) -> usize {
        [self.users, self.devices, self.events]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }
}

/// Read and maintenance operations served so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub lookups: u64,
    pub aggregations: u64,
    pub truncations: u64,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    lookups: AtomicU64,
    aggregations: AtomicU64,
    truncations: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn has_table(&self, table: Table) -> bool {
        self.tables.lock().await.len(table).is_some()
    }

    pub async fn snapshot(&self) -> MemorySnapshot {
        let tables = self.tables.lock().await;
        MemorySnapshot {
            users: tables.len(Table::Users),
            devices: tables.len(Table::Devices),
            events: tables.len(Table::Events),
        }
    }

    /// Event timestamps in insertion order.
    pub async fn event_timestamps(&self) -> Vec<DateTime<Utc>> {
        let tables = self.tables.lock().await;
        tables
            .events
            .iter()
            .flatten()
            .map(|e| e.created_at)
            .collect()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            lookups: self.lookups.load(Ordering::SeqCst),
            aggregations: self.aggregations.load(Ordering::SeqCst),
            truncations: self.truncations.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn default_key_selection(&self) -> KeySelection {
        KeySelection::Uniform
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.users.get_or_insert_with(Vec::new);
        tables.devices.get_or_insert_with(Vec::new);
        tables.events.get_or_insert_with(Vec::new);
        Ok(())
    }

    async fn drop_tables(&self) -> Result<(), StoreError> {
        *self.tables.lock().await = Tables::default();
        Ok(())
    }

    async fn truncate(&self, table: Table) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let missing = || MemoryStoreError::MissingTable(table);
        match table {
            Table::Users => tables.users.as_mut().ok_or_else(missing)?.clear(),
            Table::Devices => tables.devices.as_mut().ok_or_else(missing)?.clear(),
            Table::Events => tables.events.as_mut().ok_or_else(missing)?.clear(),
        }
        self.truncations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, table: Table) -> Result<u64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .len(table)
            .ok_or(MemoryStoreError::MissingTable(table))?)
    }

    async fn insert_users(&self, users: &[User]) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.is_none() {
            return Err(MemoryStoreError::MissingTable(Table::Users).into());
        }
        let rows: Vec<User> = users
            .iter()
            .map(|u| User {
                id: Some(tables.next_id(Table::Users)),
                ..u.clone()
            })
            .collect();
        tables.users.iter_mut().for_each(|t| t.extend(rows.iter().cloned()));
        Ok(rows.len() as u64)
    }

    async fn insert_devices(&self, devices: &[Device]) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.devices.is_none() {
            return Err(MemoryStoreError::MissingTable(Table::Devices).into());
        }
        let rows: Vec<Device> = devices
            .iter()
            .map(|d| Device {
                id: Some(tables.next_id(Table::Devices)),
                ..d.clone()
            })
            .collect();
        tables.devices.iter_mut().for_each(|t| t.extend(rows.iter().cloned()));
        Ok(rows.len() as u64)
    }

    async fn insert_events(&self, events: &[Event]) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.events.is_none() {
            return Err(MemoryStoreError::MissingTable(Table::Events).into());
        }
        let rows: Vec<Event> = events
            .iter()
            .map(|e| Event {
                id: Some(tables.next_id(Table::Events)),
                ..e.clone()
            })
            .collect();
        tables.events.iter_mut().for_each(|t| t.extend(rows.iter().cloned()));
        Ok(rows.len() as u64)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.insert_events(std::slice::from_ref(event)).await?;
        Ok(())
    }

    async fn latest_event(&self) -> Result<Option<Event>, StoreError> {
        let tables = self.tables.lock().await;
        let events = tables
            .events
            .as_ref()
            .ok_or(MemoryStoreError::MissingTable(Table::Events))?;
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(events.iter().max_by_key(|e| e.id).cloned())
    }

    async fn yearly_summary(&self) -> Result<Vec<YearlySummary>, StoreError> {
        let tables = self.tables.lock().await;
        let (Some(users), Some(devices), Some(events)) =
            (&tables.users, &tables.devices, &tables.events)
        else {
            let missing = Table::ALL
                .into_iter()
                .find(|t| tables.len(*t).is_none())
                .unwrap_or(Table::Events);
            return Err(MemoryStoreError::MissingTable(missing).into());
        };
        self.aggregations.fetch_add(1, Ordering::SeqCst);

        let user_ids: HashMap<i64, ()> = users.iter().filter_map(|u| u.id).map(|id| (id, ())).collect();
        let device_owners: HashMap<i64, Option<i64>> = devices
            .iter()
            .filter_map(|d| d.id.map(|id| (id, d.user_id)))
            .collect();

        let mut years: BTreeMap<i32, YearlySummary> = BTreeMap::new();
        for event in events {
            let Some(device_id) = event.device_id else {
                continue;
            };
            let Some(Some(user_id)) = device_owners.get(&device_id) else {
                continue;
            };
            if !user_ids.contains_key(user_id) {
                continue;
            }
            let year = event.created_at.year();
            let summary = years.entry(year).or_insert(YearlySummary {
                year,
                value_sum: 0.0,
                device_count: 0,
                user_count: 0,
            });
            summary.value_sum += event.value;
            summary.device_count += 1;
            summary.user_count += 1;
        }
        Ok(years.into_values().collect())
    }

    async fn random_id(&self, table: Table) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.lock().await;
        let ids = tables.ids(table)?;
        if ids.is_empty() {
            return Ok(None);
        }
        let pick = rand::thread_rng().gen_range(0..ids.len());
        Ok(Some(ids[pick]))
    }

    async fn id_range(&self, table: Table) -> Result<Option<KeyRange>, StoreError> {
        let tables = self.tables.lock().await;
        let ids = tables.ids(table)?;
        let (Some(min), Some(max)) = (ids.iter().min(), ids.iter().max()) else {
            return Ok(None);
        };
        Ok(KeyRange::new(*min, *max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tsbench_core::Action;

    fn event(device_id: Option<i64>, year: i32, value: f64) -> Event {
        Event {
            id: None,
            value,
            action: Action::Create,
            payload: json!({}),
            device_id,
            created_at: Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_missing_tables_are_errors() {
        let store = InMemoryStore::new();

        assert!(store.count(Table::Users).await.is_err());
        let err = store.latest_event().await.unwrap_err();
        assert_eq!(err.backend(), "memory");
        assert!(err.to_string().contains("\"events\" does not exist"));
        assert!(store.insert_event(&event(None, 2020, 1.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_create_and_drop_are_idempotent() {
        let store = InMemoryStore::new();
        store.create_tables().await.unwrap();
        store.insert_event(&event(None, 2020, 1.0)).await.unwrap();
        store.create_tables().await.unwrap();
        assert_eq!(store.count(Table::Events).await.unwrap(), 1);

        store.drop_tables().await.unwrap();
        store.drop_tables().await.unwrap();
        assert!(!store.has_table(Table::Events).await);
    }

    #[tokio::test]
    async fn test_ids_are_assigned_and_not_reused_after_truncate() {
        let store = InMemoryStore::new();
        store.create_tables().await.unwrap();

        store
            .insert_events(&[event(None, 2020, 1.0), event(None, 2020, 2.0)])
            .await
            .unwrap();
        store.truncate(Table::Events).await.unwrap();
        store.insert_event(&event(None, 2020, 3.0)).await.unwrap();

        let latest = store.latest_event().await.unwrap().unwrap();
        assert_eq!(latest.id, Some(3));
        assert_eq!(store.id_range(Table::Events).await.unwrap(), KeyRange::new(3, 3));
        assert_eq!(store.stats().truncations, 1);
    }

    #[tokio::test]
    async fn test_yearly_summary_joins_and_groups() {
        let store = InMemoryStore::new();
        store.create_tables().await.unwrap();
        let now = Utc::now();
        store
            .insert_users(&[User {
                id: None,
                name: "u".into(),
                created_at: now,
            }])
            .await
            .unwrap();
        store
            .insert_devices(&[
                Device {
                    id: None,
                    name: "owned".into(),
                    user_id: Some(1),
                    created_at: now,
                },
                Device {
                    id: None,
                    name: "orphan".into(),
                    user_id: None,
                    created_at: now,
                },
            ])
            .await
            .unwrap();
        store
            .insert_events(&[
                event(Some(1), 2021, 1.5),
                event(Some(1), 2021, 2.5),
                event(Some(1), 2023, 4.0),
                event(Some(2), 2023, 100.0),
                event(None, 2023, 100.0),
            ])
            .await
            .unwrap();

        let summary = store.yearly_summary().await.unwrap();

        assert_eq!(
            summary,
            vec![
                YearlySummary {
                    year: 2021,
                    value_sum: 4.0,
                    device_count: 2,
                    user_count: 2,
                },
                YearlySummary {
                    year: 2023,
                    value_sum: 4.0,
                    device_count: 1,
                    user_count: 1,
                },
            ]
        );
        assert_eq!(store.stats().aggregations, 1);
    }

    #[tokio::test]
    async fn test_random_id_is_none_for_empty_table() {
        let store = InMemoryStore::new();
        store.create_tables().await.unwrap();
        assert_eq!(store.random_id(Table::Devices).await.unwrap(), None);
        assert_eq!(store.id_range(Table::Devices).await.unwrap(), None);
    }
}
