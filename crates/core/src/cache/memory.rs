//! In-process partition store.
//!
//! Same contract as [`CacheDb`](super::CacheDb) but backed by a map behind a
//! tokio `RwLock`. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::compute_entry_key;
use super::{CacheStore, StorageEstimate, StorageEstimator};
use crate::Error;
use crate::message::{Request, Response};
use crate::partition::Partition;

/// Entries of one partition and their total stored size.
#[derive(Debug, Default)]
struct Stored {
    entries: HashMap<String, Response>,
    bytes: u64,
}

#[derive(Debug, Default)]
struct Inner {
    partitions: BTreeMap<String, Stored>,
    used: u64,
}

#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    quota: u64,
}

impl MemoryStore {
    pub fn new(quota: u64) -> Self {
        Self { inner: Arc::new(RwLock::new(Inner::default())), quota }
    }

    /// Number of entries stored in a partition.
    pub async fn entry_count(&self, partition: Partition) -> usize {
        let inner = self.inner.read().await;
        inner.partitions.get(partition.name()).map_or(0, |p| p.entries.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(u64::MAX)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, partition: Partition) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.partitions.entry(partition.name().to_string()).or_default();
        Ok(())
    }

    async fn lookup(&self, partition: Partition, request: &Request) -> Result<Option<Response>, Error> {
        let key = compute_entry_key(&request.method, request.url.as_str());
        let inner = self.inner.read().await;
        Ok(inner
            .partitions
            .get(partition.name())
            .and_then(|p| p.entries.get(&key))
            .cloned())
    }

    async fn put(&self, partition: Partition, request: &Request, response: Response) -> Result<(), Error> {
        let key = compute_entry_key(&request.method, request.url.as_str());
        let size = response.stored_size();
        let mut inner = self.inner.write().await;

        let replaced = inner
            .partitions
            .get(partition.name())
            .and_then(|p| p.entries.get(&key))
            .map_or(0, Response::stored_size);
        let used = inner.used - replaced;
        if used.saturating_add(size) > self.quota {
            return Err(Error::QuotaExceeded(format!("{} bytes used of {}", inner.used, self.quota)));
        }

        inner.used = used + size;
        let stored = inner.partitions.entry(partition.name().to_string()).or_default();
        stored.bytes = stored.bytes - replaced + size;
        stored.entries.insert(key, response);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        match inner.partitions.remove(name) {
            Some(stored) => {
                inner.used -= stored.bytes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.partitions.keys().cloned().collect())
    }
}

#[async_trait]
impl StorageEstimator for MemoryStore {
    async fn estimate(&self, partition: Option<Partition>) -> Result<StorageEstimate, Error> {
        let inner = self.inner.read().await;
        let usage = match partition {
            Some(p) => inner.partitions.get(p.name()).map_or(0, |stored| stored.bytes),
            None => inner.used,
        };
        Ok(StorageEstimate { usage, quota: self.quota })
    }
}
