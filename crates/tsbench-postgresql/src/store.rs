//! [`Store`] implementation over tokio-postgres.

use crate::error::PostgresStoreError;
use crate::pool::{ClientPool, DEFAULT_POOL_SIZE};
use crate::sql::{self, Flavor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::{debug, info};
use tsbench_core::{Action, Device, Event, KeyRange, Table, User, YearlySummary};
use tsbench_executor::{Store, StoreError};

/// PostgreSQL (or TimescaleDB) store.
pub struct PostgresStore {
    pool: ClientPool,
    flavor: Flavor,
}

impl PostgresStore {
    /// Connect to a PostgreSQL server.
    ///
    /// # Arguments
    ///
    /// * `connection_string` - e.g. "host=localhost user=postgres password=postgres dbname=tsbench"
    /// * `pool_size` - connections shared by all tasks, [`DEFAULT_POOL_SIZE`] when `None`
    pub async fn connect(
        connection_string: &str,
        pool_size: Option<usize>,
    ) -> Result<Self, PostgresStoreError> {
        Self::connect_flavor(connection_string, pool_size, Flavor::Plain).await
    }

    /// Connect to a PostgreSQL server with the timescaledb extension.
    pub async fn connect_timescale(
        connection_string: &str,
        pool_size: Option<usize>,
    ) -> Result<Self, PostgresStoreError> {
        Self::connect_flavor(connection_string, pool_size, Flavor::Timescale).await
    }

    async fn connect_flavor(
        connection_string: &str,
        pool_size: Option<usize>,
        flavor: Flavor,
    ) -> Result<Self, PostgresStoreError> {
        let pool =
            ClientPool::connect(connection_string, pool_size.unwrap_or(DEFAULT_POOL_SIZE)).await?;
        Ok(Self { pool, flavor })
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    fn wrap(&self, e: impl Into<PostgresStoreError>) -> StoreError {
        StoreError::new(self.flavor.backend(), e.into())
    }

    async fn execute_all(&self, statements: &[String]) -> Result<(), PostgresStoreError> {
        let client = self.pool.get();
        for statement in statements {
            debug!("DDL: {}", statement);
            client.batch_execute(statement).await?;
        }
        Ok(())
    }

    async fn create_all(&self) -> Result<(), PostgresStoreError> {
        self.execute_all(&sql::setup_prologue(self.flavor)).await?;
        let tables: Vec<String> = Table::ALL
            .iter()
            .map(|t| sql::generate_create_table(*t))
            .collect();
        self.execute_all(&tables).await?;
        self.execute_all(&sql::setup_epilogue(self.flavor)).await?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        table: Table,
        rows: usize,
        params: Vec<Box<dyn ToSql + Sync + Send>>,
    ) -> Result<u64, PostgresStoreError> {
        if rows == 0 {
            return Ok(0);
        }

        let sql = sql::generate_insert(table, rows);

        // Convert to references for execution
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        Ok(self.pool.get().execute(&sql, &param_refs).await?)
    }

    async fn count_rows(&self, table: Table) -> Result<u64, PostgresStoreError> {
        let row = self
            .pool
            .get()
            .query_one(&sql::generate_count(table), &[])
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_latest_event(&self) -> Result<Option<Event>, PostgresStoreError> {
        let row = self.pool.get().query_opt(sql::LATEST_EVENT, &[]).await?;
        row.as_ref().map(event_from_row).transpose()
    }

    async fn fetch_yearly_summary(&self) -> Result<Vec<YearlySummary>, PostgresStoreError> {
        let rows = self.pool.get().query(sql::YEARLY_SUMMARY, &[]).await?;
        rows.iter()
            .map(|row| {
                Ok(YearlySummary {
                    year: row.try_get("year")?,
                    value_sum: row.try_get::<_, Option<f64>>("value_sum")?.unwrap_or(0.0),
                    device_count: row.try_get("device_count")?,
                    user_count: row.try_get("user_count")?,
                })
            })
            .collect()
    }

    async fn fetch_random_id(&self, table: Table) -> Result<Option<i64>, PostgresStoreError> {
        let row = self
            .pool
            .get()
            .query_opt(&sql::generate_random_id(table), &[])
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get(0)?),
            None => None,
        })
    }

    async fn fetch_id_range(&self, table: Table) -> Result<Option<KeyRange>, PostgresStoreError> {
        let row = self
            .pool
            .get()
            .query_one(&sql::generate_id_range(table), &[])
            .await?;
        let min: Option<i64> = row.try_get(0)?;
        let max: Option<i64> = row.try_get(1)?;
        Ok(min.zip(max).and_then(|(min, max)| KeyRange::new(min, max)))
    }
}

fn user_params(users: &[User]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::with_capacity(users.len() * 2);
    for user in users {
        params.push(Box::new(user.name.clone()));
        params.push(Box::new(user.created_at));
    }
    params
}

fn device_params(devices: &[Device]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::with_capacity(devices.len() * 3);
    for device in devices {
        params.push(Box::new(device.name.clone()));
        params.push(Box::new(device.user_id));
        params.push(Box::new(device.created_at));
    }
    params
}

fn event_params(events: &[Event]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::with_capacity(events.len() * 5);
    for event in events {
        params.push(Box::new(event.value));
        params.push(Box::new(event.action.as_str().to_string()));
        params.push(Box::new(event.payload.clone()));
        params.push(Box::new(event.device_id));
        params.push(Box::new(event.created_at));
    }
    params
}

fn event_from_row(row: &Row) -> Result<Event, PostgresStoreError> {
    let action: String = row.try_get("action")?;
    let action = action
        .parse::<Action>()
        .map_err(|e| PostgresStoreError::InvalidRow {
            table: "events",
            reason: e.to_string(),
        })?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Event {
        id: Some(row.try_get("id")?),
        value: row.try_get("value")?,
        action,
        payload: row
            .try_get::<_, Option<serde_json::Value>>("payload")?
            .unwrap_or(serde_json::Value::Null),
        device_id: row.try_get("device_id")?,
        created_at,
    })
}

#[async_trait]
impl Store for PostgresStore {
    fn backend(&self) -> &'static str {
        self.flavor.backend()
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        info!("Creating {} tables", self.backend());
        self.create_all().await.map_err(|e| self.wrap(e))
    }

    async fn drop_tables(&self) -> Result<(), StoreError> {
        info!("Dropping {} tables", self.backend());
        let statements: Vec<String> = Table::ALL
            .iter()
            .rev()
            .map(|t| sql::generate_drop_table(*t))
            .collect();
        self.execute_all(&statements).await.map_err(|e| self.wrap(e))
    }

    async fn truncate(&self, table: Table) -> Result<(), StoreError> {
        self.execute_all(&[sql::generate_truncate(table)])
            .await
            .map_err(|e| self.wrap(e))
    }

    async fn count(&self, table: Table) -> Result<u64, StoreError> {
        self.count_rows(table).await.map_err(|e| self.wrap(e))
    }

    async fn insert_users(&self, users: &[User]) -> Result<u64, StoreError> {
        self.insert_rows(Table::Users, users.len(), user_params(users))
            .await
            .map_err(|e| self.wrap(e))
    }

    async fn insert_devices(&self, devices: &[Device]) -> Result<u64, StoreError> {
        self.insert_rows(Table::Devices, devices.len(), device_params(devices))
            .await
            .map_err(|e| self.wrap(e))
    }

    async fn insert_events(&self, events: &[Event]) -> Result<u64, StoreError> {
        self.insert_rows(Table::Events, events.len(), event_params(events))
            .await
            .map_err(|e| self.wrap(e))
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.insert_events(std::slice::from_ref(event)).await?;
        Ok(())
    }

    async fn latest_event(&self) -> Result<Option<Event>, StoreError> {
        self.fetch_latest_event().await.map_err(|e| self.wrap(e))
    }

    async fn yearly_summary(&self) -> Result<Vec<YearlySummary>, StoreError> {
        self.fetch_yearly_summary().await.map_err(|e| self.wrap(e))
    }

    async fn random_id(&self, table: Table) -> Result<Option<i64>, StoreError> {
        self.fetch_random_id(table).await.map_err(|e| self.wrap(e))
    }

    async fn id_range(&self, table: Table) -> Result<Option<KeyRange>, StoreError> {
        self.fetch_id_range(table).await.map_err(|e| self.wrap(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_event_params_follow_insert_columns() {
        let event = Event {
            id: None,
            value: 0.5,
            action: Action::Update,
            payload: json!({"foo": "bar"}),
            device_id: Some(7),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let params = event_params(&[event.clone(), event]);
        assert_eq!(params.len(), 2 * sql::insert_columns(Table::Events).len());
    }

    #[test]
    fn test_user_and_device_params_follow_insert_columns() {
        let now = Utc::now();
        let users = vec![User {
            id: None,
            name: "a".into(),
            created_at: now,
        }];
        let devices = vec![Device {
            id: None,
            name: "d".into(),
            user_id: None,
            created_at: now,
        }];
        assert_eq!(
            user_params(&users).len(),
            sql::insert_columns(Table::Users).len()
        );
        assert_eq!(
            device_params(&devices).len(),
            sql::insert_columns(Table::Devices).len()
        );
    }
}
