//! In-memory backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use xpanel_core::{Client, Endpoint, Protocol};

use crate::codec::validate_client;
use crate::error::StoreError;
use crate::loaded::Loaded;
use crate::records::{check_port, remove_clients, remove_endpoints, update_first};
use crate::traits::{ClientMutator, RecordStore};

#[derive(Debug, Default)]
struct Tables {
    clients: Vec<Client>,
    endpoints: Vec<Endpoint>,
}

/// Record store held entirely in memory.
///
/// Follows the same mutation rules as [`FlatFileStore`](crate::FlatFileStore),
/// which makes it suitable for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with records.
    pub fn with_records(
        clients: impl IntoIterator<Item = Client>,
        endpoints: impl IntoIterator<Item = Endpoint>,
    ) -> Self {
        Self {
            tables: Mutex::new(Tables {
                clients: clients.into_iter().collect(),
                endpoints: endpoints.into_iter().collect(),
            }),
        }
    }

    /// Snapshot of the client table.
    pub fn clients(&self) -> Vec<Client> {
        self.tables.lock().clients.clone()
    }

    /// Snapshot of the endpoint table.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.tables.lock().endpoints.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_clients(&self) -> Result<Loaded<Client>, StoreError> {
        Ok(Loaded::new(self.clients()))
    }

    async fn append_client(&self, client: &Client) -> Result<(), StoreError> {
        validate_client(client)?;
        self.tables.lock().clients.push(client.clone());
        Ok(())
    }

    async fn update_client(
        &self,
        username: &str,
        mutator: ClientMutator<'_>,
    ) -> Result<Client, StoreError> {
        let mut tables = self.tables.lock();
        update_first(&mut tables.clients, username, mutator)
    }

    async fn delete_client(&self, username: &str) -> Result<usize, StoreError> {
        Ok(remove_clients(&mut self.tables.lock().clients, username))
    }

    async fn list_endpoints(&self) -> Result<Loaded<Endpoint>, StoreError> {
        Ok(Loaded::new(self.endpoints()))
    }

    async fn add_endpoint(&self, protocol: Protocol, port: u16) -> Result<Endpoint, StoreError> {
        let mut tables = self.tables.lock();
        check_port(&tables.endpoints, port)?;
        let endpoint = Endpoint::new(protocol, port);
        tables.endpoints.push(endpoint.clone());
        Ok(endpoint)
    }

    async fn delete_endpoint(&self, port: u16) -> Result<usize, StoreError> {
        Ok(remove_endpoints(&mut self.tables.lock().endpoints, port))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use xpanel_core::{Family, Transport};

    use super::*;

    fn client(name: &str) -> Client {
        Client {
            username: name.into(),
            quota: 0.0,
            used: 0.0,
            expiry: NaiveDate::from_ymd_opt(2030, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            protocol: "trojan-grpc".into(),
            uuid: "pw".into(),
        }
    }

    #[tokio::test]
    async fn behaves_like_file_store() {
        let store = MemoryStore::new();
        store.append_client(&client("a")).await.unwrap();
        store.append_client(&client("a")).await.unwrap();

        let updated = store
            .update_client("a", &mut |c: &mut Client| c.quota = 2.0)
            .await
            .unwrap();
        assert_eq!(updated.quota, 2.0);
        assert_eq!(store.clients()[1].quota, 0.0);
        assert_eq!(store.delete_client("a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn usable_through_arc() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::with_records(
            [client("a")],
            [Endpoint::new(Protocol::new(Family::Trojan, Transport::Grpc), 2083)],
        ));
        let shared = Arc::clone(&store);
        assert_eq!(shared.list_clients().await.unwrap().records.len(), 1);

        let err = shared
            .add_endpoint(Protocol::new(Family::Vless, Transport::Ws), 2083)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { port: 2083, .. }));
        assert_eq!(shared.delete_endpoint(2083).await.unwrap(), 1);
    }
}
