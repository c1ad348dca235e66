//! A fixed set of connections handed out round-robin.

use crate::error::PostgresStoreError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};
use tsbench_core::mask_connection_password;

/// Connections opened when the configuration does not set `pool_size`.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Connections shared by every task of a run.
///
/// `tokio_postgres::Client` pipelines concurrent queries over one
/// connection, so tasks borrow a client without locking it.
pub struct ClientPool {
    clients: Vec<Client>,
    next: AtomicUsize,
}

impl ClientPool {
    /// Open `size` connections to `connection_string`.
    pub async fn connect(connection_string: &str, size: usize) -> Result<Self, PostgresStoreError> {
        let size = size.max(1);
        debug!(
            "Opening {} PostgreSQL connections to {}",
            size,
            mask_connection_password(connection_string)
        );

        let mut clients = Vec::with_capacity(size);
        for _ in 0..size {
            let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

            // Spawn the connection task
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("PostgreSQL connection error: {}", e);
                }
            });

            clients.push(client);
        }

        // Test connection
        clients[0].simple_query("SELECT 1").await?;

        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
        })
    }

    /// The next client in rotation.
    pub fn get(&self) -> &Client {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
