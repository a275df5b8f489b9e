//! Record store trait.

use std::sync::Arc;

use async_trait::async_trait;
use xpanel_core::{Client, Endpoint, Protocol};

use crate::error::StoreError;
use crate::loaded::Loaded;

/// In-place edit applied to a client record.
pub type ClientMutator<'a> = &'a mut (dyn FnMut(&mut Client) + Send);

/// Persistent collection of client and endpoint records.
///
/// Implementations must be thread-safe (`Send + Sync`). Callers serialize
/// mutations; a store does not need to guard against concurrent writers
/// from other processes.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All readable client records in storage order.
    async fn list_clients(&self) -> Result<Loaded<Client>, StoreError>;

    /// Add a client at the end. Duplicate usernames are not checked here.
    async fn append_client(&self, client: &Client) -> Result<(), StoreError>;

    /// Apply `mutator` to the first record named `username` and persist.
    ///
    /// Returns the record as written.
    async fn update_client(
        &self,
        username: &str,
        mutator: ClientMutator<'_>,
    ) -> Result<Client, StoreError>;

    /// Remove every record named `username`. Returns how many were removed.
    async fn delete_client(&self, username: &str) -> Result<usize, StoreError>;

    /// All readable endpoint records in storage order.
    async fn list_endpoints(&self) -> Result<Loaded<Endpoint>, StoreError>;

    /// Add an endpoint with the canonical tag for `protocol`.
    ///
    /// Fails with [`StoreError::Conflict`] if the port is taken by another
    /// endpoint or reserved for the engine admin inbound.
    async fn add_endpoint(&self, protocol: Protocol, port: u16) -> Result<Endpoint, StoreError>;

    /// Remove every endpoint on `port`. Returns how many were removed.
    async fn delete_endpoint(&self, port: u16) -> Result<usize, StoreError>;
}

/// Blanket implementation for `Arc<S>` where `S: RecordStore`.
///
/// This allows passing `Arc<dyn RecordStore>` to functions expecting `impl RecordStore`.
#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    #[inline]
    async fn list_clients(&self) -> Result<Loaded<Client>, StoreError> {
        (**self).list_clients().await
    }

    #[inline]
    async fn append_client(&self, client: &Client) -> Result<(), StoreError> {
        (**self).append_client(client).await
    }

    #[inline]
    async fn update_client(
        &self,
        username: &str,
        mutator: ClientMutator<'_>,
    ) -> Result<Client, StoreError> {
        (**self).update_client(username, mutator).await
    }

    #[inline]
    async fn delete_client(&self, username: &str) -> Result<usize, StoreError> {
        (**self).delete_client(username).await
    }

    #[inline]
    async fn list_endpoints(&self) -> Result<Loaded<Endpoint>, StoreError> {
        (**self).list_endpoints().await
    }

    #[inline]
    async fn add_endpoint(&self, protocol: Protocol, port: u16) -> Result<Endpoint, StoreError> {
        (**self).add_endpoint(protocol, port).await
    }

    #[inline]
    async fn delete_endpoint(&self, port: u16) -> Result<usize, StoreError> {
        (**self).delete_endpoint(port).await
    }
}
