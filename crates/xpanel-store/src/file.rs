//! Flat-file backend.
//!
//! Two newline-terminated text files, one record per line. Appends go to
//! the end of the file; updates and deletes rewrite it atomically.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use xpanel_core::{Client, DEFAULT_CLIENTS_PATH, DEFAULT_INBOUNDS_PATH, Endpoint, Protocol};

use crate::atomic::{read_or_empty, write_atomic};
use crate::codec::{decode_clients, decode_endpoints, encode_client, encode_endpoint};
use crate::error::StoreError;
use crate::loaded::Loaded;
use crate::records::{check_port, remove_clients, remove_endpoints, update_first};
use crate::traits::{ClientMutator, RecordStore};

/// Record store over the clients and inbounds database files.
#[derive(Debug)]
pub struct FlatFileStore {
    clients_path: PathBuf,
    inbounds_path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FlatFileStore {
    pub fn new(clients_path: impl Into<PathBuf>, inbounds_path: impl Into<PathBuf>) -> Self {
        Self {
            clients_path: clients_path.into(),
            inbounds_path: inbounds_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn clients_path(&self) -> &Path {
        &self.clients_path
    }

    pub fn inbounds_path(&self) -> &Path {
        &self.inbounds_path
    }

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn load_clients(&self) -> Result<Loaded<Client>, StoreError> {
        let data = read_or_empty(&self.clients_path).await?;
        let loaded = decode_clients(&data, Self::now());
        for issue in &loaded.issues {
            warn!(path = %self.clients_path.display(), %issue, "malformed client record");
        }
        Ok(loaded)
    }

    async fn load_endpoints(&self) -> Result<Loaded<Endpoint>, StoreError> {
        let data = read_or_empty(&self.inbounds_path).await?;
        let loaded = decode_endpoints(&data);
        for issue in &loaded.issues {
            warn!(path = %self.inbounds_path.display(), %issue, "malformed endpoint record");
        }
        Ok(loaded)
    }

    async fn append_line(path: &Path, line: &str) -> Result<(), StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .await?;

        // a file edited by hand may lack its final newline; without one the
        // new record would continue the previous line
        let mut out = String::with_capacity(line.len() + 2);
        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                out.push('\n');
            }
        }
        out.push_str(line);
        out.push('\n');
        file.write_all(out.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn rewrite_clients(&self, loaded: &Loaded<Client>) -> Result<(), StoreError> {
        let mut out = String::new();
        for client in &loaded.records {
            out.push_str(&encode_client(client)?);
            out.push('\n');
        }
        if loaded.skipped() > 0 {
            warn!(
                path = %self.clients_path.display(),
                dropped = loaded.skipped(),
                "rewriting without unreadable lines"
            );
        }
        write_atomic(&self.clients_path, out.as_bytes()).await?;
        Ok(())
    }

    async fn rewrite_endpoints(&self, loaded: &Loaded<Endpoint>) -> Result<(), StoreError> {
        let mut out = String::new();
        for endpoint in &loaded.records {
            out.push_str(&encode_endpoint(endpoint));
            out.push('\n');
        }
        if loaded.skipped() > 0 {
            warn!(
                path = %self.inbounds_path.display(),
                dropped = loaded.skipped(),
                "rewriting without unreadable lines"
            );
        }
        write_atomic(&self.inbounds_path, out.as_bytes()).await?;
        Ok(())
    }
}

impl Default for FlatFileStore {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENTS_PATH, DEFAULT_INBOUNDS_PATH)
    }
}

#[async_trait]
impl RecordStore for FlatFileStore {
    async fn list_clients(&self) -> Result<Loaded<Client>, StoreError> {
        self.load_clients().await
    }

    async fn append_client(&self, client: &Client) -> Result<(), StoreError> {
        let line = encode_client(client)?;
        let _guard = self.write_lock.lock().await;
        Self::append_line(&self.clients_path, &line).await?;
        debug!(username = %client.username, protocol = %client.protocol, "client appended");
        Ok(())
    }

    async fn update_client(
        &self,
        username: &str,
        mutator: ClientMutator<'_>,
    ) -> Result<Client, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut loaded = self.load_clients().await?;
        let updated = update_first(&mut loaded.records, username, mutator)?;
        self.rewrite_clients(&loaded).await?;
        debug!(username, used = updated.used, "client updated");
        Ok(updated)
    }

    async fn delete_client(&self, username: &str) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut loaded = self.load_clients().await?;
        let removed = remove_clients(&mut loaded.records, username);
        if removed > 0 {
            self.rewrite_clients(&loaded).await?;
        }
        debug!(username, removed, "client delete");
        Ok(removed)
    }

    async fn list_endpoints(&self) -> Result<Loaded<Endpoint>, StoreError> {
        self.load_endpoints().await
    }

    async fn add_endpoint(&self, protocol: Protocol, port: u16) -> Result<Endpoint, StoreError> {
        let _guard = self.write_lock.lock().await;
        let loaded = self.load_endpoints().await?;
        check_port(&loaded.records, port)?;
        let endpoint = Endpoint::new(protocol, port);
        Self::append_line(&self.inbounds_path, &encode_endpoint(&endpoint)).await?;
        debug!(tag = %endpoint.tag, port, "endpoint added");
        Ok(endpoint)
    }

    async fn delete_endpoint(&self, port: u16) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut loaded = self.load_endpoints().await?;
        let removed = remove_endpoints(&mut loaded.records, port);
        if removed > 0 {
            self.rewrite_endpoints(&loaded).await?;
        }
        debug!(port, removed, "endpoint delete");
        Ok(removed)
    }
}
