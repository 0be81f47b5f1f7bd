//! Cache-first, populate-on-miss request handling.

use std::sync::Arc;

use respcache_core::{CacheStore, Category, Error, Partition, Request, Response, Router, Routed, classify};

use super::guard::UnregisterGuard;
use crate::fetch::Network;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Served from a partition without touching the network.
    Cache,
    /// Fetched on a cache miss.
    Network,
    /// Fetched directly; the cache was never consulted.
    Bypass,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Network => "network",
            Source::Bypass => "bypass",
        }
    }
}

/// A response together with how it was obtained.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    pub category: Category,
    pub partition: Option<Partition>,
}

/// Coordinates classification, routing, the partition store and the network
/// for a single request.
pub struct Orchestrator {
    router: Router,
    never_cache: Vec<String>,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    guard: Arc<UnregisterGuard>,
    success_only: bool,
}

impl Orchestrator {
    pub fn new(
        router: Router, never_cache: Vec<String>, store: Arc<dyn CacheStore>, network: Arc<dyn Network>,
        guard: Arc<UnregisterGuard>,
    ) -> Self {
        Self { router, never_cache, store, network, guard, success_only: false }
    }

    /// Store only 2xx responses. By default every response the network
    /// returns is stored, error statuses included.
    pub fn with_success_only(mut self, success_only: bool) -> Self {
        self.success_only = success_only;
        self
    }

    fn is_never_cached(&self, path: &str) -> bool {
        self.never_cache.iter().any(|p| p == path)
    }

    /// Serve `request` from its partition, or fetch and populate on a miss.
    ///
    /// Store failures on open or match and network failures on a miss are
    /// logged, trip the unregister guard and come back as `Err`. A failed
    /// write only costs the cache entry.
    pub async fn handle(&self, request: Request) -> Result<Served, Error> {
        let path = request.path().to_string();
        let Routed { request, category } = self.router.route(classify(&path), &request, &path);

        let partition = match category.partition() {
            Some(partition) if !self.is_never_cached(request.path()) => partition,
            _ => {
                tracing::debug!(url = %request.url, ?category, "bypassing cache");
                let response = self.network.fetch(&request).await?;
                return Ok(Served { response, source: Source::Bypass, category, partition: None });
            }
        };

        if let Err(e) = self.store.open(partition).await {
            tracing::error!(error = %e, %partition, "failed to open cache partition");
            self.guard.trigger_unregister().await;
            return Err(e);
        }

        match self.store.lookup(partition, &request).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url, %partition, "cache hit");
                return Ok(Served { response, source: Source::Cache, category, partition: Some(partition) });
            }
            Ok(None) => tracing::debug!(url = %request.url, %partition, "cache miss"),
            Err(e) => {
                tracing::error!(error = %e, %partition, url = %request.url, "failed to match request in cache");
                self.guard.trigger_unregister().await;
                return Err(e);
            }
        }

        let response = match self.network.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, url = %request.url, "failed to fetch on cache miss");
                self.guard.trigger_unregister().await;
                return Err(e);
            }
        };

        if self.success_only && !response.is_success() {
            tracing::debug!(status = response.status, url = %request.url, "not caching unsuccessful response");
        } else if let Err(e) = self.store.put(partition, &request, response.clone()).await {
            tracing::warn!(error = %e, %partition, url = %request.url, "failed to store response; serving uncached");
        }

        Ok(Served { response, source: Source::Network, category, partition: Some(partition) })
    }
}
