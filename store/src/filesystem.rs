//! The filesystem store keeps every table in memory and rewrites a JSON
//! snapshot after each mutation, so a single-node deployment survives
//! restarts without an external database.

use crate::document::{DocumentStore, ItemKey, Table};
use crate::errors::StoreError;
use crate::memory::{MemoryStore, Snapshot};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct FilesystemStore {
    path: PathBuf,
    inner: MemoryStore,
    // Held across a mutation and its snapshot write, so a failed write can be
    // rolled back before anyone else mutates.
    write_lock: Mutex<()>,
}

impl FilesystemStore {
    /// Opens the snapshot at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let inner = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                MemoryStore::from_snapshot(snapshot)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No store snapshot found, starting empty");
                MemoryStore::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(FilesystemStore {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    /// Writes the current tables to disk. Callers hold `write_lock`.
    async fn write_snapshot(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&self.inner.snapshot())?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Persisted store snapshot");
        Ok(())
    }

    /// Persists a mutation of `key`, restoring `previous` in memory if the
    /// snapshot cannot be written.
    async fn commit(
        &self,
        table: Table,
        key: &ItemKey,
        previous: Option<JsonValue>,
    ) -> Result<(), StoreError> {
        let Err(e) = self.write_snapshot().await else {
            return Ok(());
        };

        tracing::error!(path = %self.path.display(), error = %e, "Failed to persist store snapshot");
        match previous {
            Some(item) => self.inner.put(table, key.clone(), item).await?,
            None => {
                self.inner.delete(table, key).await?;
            }
        }
        Err(e)
    }
}

#[async_trait]
impl DocumentStore for FilesystemStore {
    async fn get(&self, table: Table, key: &ItemKey) -> Result<Option<JsonValue>, StoreError> {
        self.inner.get(table, key).await
    }

    async fn put(&self, table: Table, key: ItemKey, item: JsonValue) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let previous = self.inner.get(table, &key).await?;
        self.inner.put(table, key.clone(), item).await?;
        self.commit(table, &key, previous).await
    }

    async fn put_if_absent(
        &self,
        table: Table,
        key: ItemKey,
        item: JsonValue,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        if !self.inner.put_if_absent(table, key.clone(), item).await? {
            return Ok(false);
        }
        self.commit(table, &key, None).await?;
        Ok(true)
    }

    async fn delete(&self, table: Table, key: &ItemKey) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let Some(previous) = self.inner.get(table, key).await? else {
            return Ok(false);
        };
        self.inner.delete(table, key).await?;
        self.commit(table, key, Some(previous)).await?;
        Ok(true)
    }

    async fn scan(&self, table: Table) -> Result<Vec<JsonValue>, StoreError> {
        self.inner.scan(table).await
    }

    async fn query(&self, table: Table, partition: &str) -> Result<Vec<JsonValue>, StoreError> {
        self.inner.query(table, partition).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        // The snapshot directory must still be reachable for writes to succeed.
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tokio::fs::metadata(dir).await?;
        Ok(())
    }
}
