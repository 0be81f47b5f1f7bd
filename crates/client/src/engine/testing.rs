//! Test doubles for the engine's collaborators.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use respcache_core::{CacheStore, Error, MemoryStore, Partition, Request, Response, StorageEstimate, StorageEstimator};

use super::guard::Registrar;
use crate::fetch::Network;

/// Network that answers from a script and counts calls.
#[derive(Default)]
pub struct ScriptedNetwork {
    responses: Mutex<HashMap<String, Response>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn respond(&self, url: &str, response: Response) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        let scripted = self.responses.lock().unwrap().get(request.url.as_str()).cloned();
        Ok(scripted.unwrap_or_else(|| Response::new(200, format!("net:{}", request.url))))
    }
}

/// Memory store with switchable failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_open: AtomicBool,
    pub fail_lookup: AtomicBool,
    pub fail_put: AtomicBool,
    pub fail_keys: AtomicBool,
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn open(&self, partition: Partition) -> Result<(), Error> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Error::Store("open rejected".into()));
        }
        self.inner.open(partition).await
    }

    async fn lookup(&self, partition: Partition, request: &Request) -> Result<Option<Response>, Error> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(Error::Store("match rejected".into()));
        }
        self.inner.lookup(partition, request).await
    }

    async fn put(&self, partition: Partition, request: &Request, response: Response) -> Result<(), Error> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(Error::QuotaExceeded("put rejected".into()));
        }
        self.inner.put(partition, request, response).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        if self.fail_keys.load(Ordering::SeqCst) {
            return Err(Error::Store("keys rejected".into()));
        }
        self.inner.keys().await
    }
}

/// Estimator reporting fixed per-partition usage.
#[derive(Default)]
pub struct FixedEstimator {
    usage: Mutex<HashMap<Partition, u64>>,
    pub fail: AtomicBool,
}

impl FixedEstimator {
    pub fn set(&self, partition: Partition, usage: u64) {
        self.usage.lock().unwrap().insert(partition, usage);
    }
}

#[async_trait]
impl StorageEstimator for FixedEstimator {
    async fn estimate(&self, partition: Option<Partition>) -> Result<StorageEstimate, Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Estimate("estimate rejected".into()));
        }
        let usage = self.usage.lock().unwrap();
        let used = match partition {
            Some(p) => usage.get(&p).copied().unwrap_or(0),
            None => usage.values().sum(),
        };
        Ok(StorageEstimate { usage: used, quota: u64::MAX })
    }
}

/// Registrar that counts unregister calls.
pub struct CountingRegistrar {
    registered: AtomicBool,
    pub unregister_calls: AtomicUsize,
    /// Fail the next unregister call, then clear.
    pub fail_next: AtomicBool,
}

impl Default for CountingRegistrar {
    fn default() -> Self {
        Self {
            registered: AtomicBool::new(true),
            unregister_calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }
}

impl CountingRegistrar {
    pub fn calls(&self) -> usize {
        self.unregister_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registrar for CountingRegistrar {
    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    async fn unregister(&self) -> Result<bool, Error> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Store("registration busy".into()));
        }
        Ok(self.registered.swap(false, Ordering::SeqCst))
    }
}
