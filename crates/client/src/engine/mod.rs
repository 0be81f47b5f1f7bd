//! The cache engine.
//!
//! ### Events
//! - `install`: a new engine version takes over immediately (skip waiting).
//! - `activate`: sweeps stale partitions; interception starts only after the
//!   sweep completes.
//! - `fetch`: GET requests over an interceptable scheme go through the
//!   [`Orchestrator`]; everything else is left to default handling.
//!
//! ### Timers
//! - Budget check: evict partitions over the memory ceiling.
//! - Crucial refresh: drop the markup and data partitions.
//!
//! Any unrecoverable store, estimate or network failure trips the
//! [`UnregisterGuard`], after which the engine stops intercepting.

pub mod guard;
pub mod lifecycle;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use respcache_core::{AppConfig, CacheStore, Error, Partition, Request, Router, StorageEstimator};
use tokio::sync::watch;

pub use guard::{InProcessRegistrar, Registrar, UnregisterGuard};
pub use lifecycle::{Lifecycle, Timers};
pub use orchestrator::{Orchestrator, Served, Source};

use crate::fetch::{Network, is_interceptable_scheme};

/// Where the engine is in its install/activate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Installed,
    Activating,
    Active,
}

/// Result of offering a fetch event to the engine.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The engine did not intercept; the caller handles the request itself.
    NotIntercepted,
    /// The engine handled the request.
    Handled(Result<Served, Error>),
}

pub struct Engine {
    orchestrator: Orchestrator,
    lifecycle: Arc<Lifecycle>,
    registrar: Arc<dyn Registrar>,
    store: Arc<dyn CacheStore>,
    estimator: Option<Arc<dyn StorageEstimator>>,
    network: Arc<dyn Network>,
    phase: watch::Sender<Phase>,
    timers: Mutex<Option<Timers>>,
    intercept_insecure: bool,
    budget_interval: Duration,
    crucial_interval: Duration,
}

impl Engine {
    pub fn new(
        config: &AppConfig, store: Arc<dyn CacheStore>, estimator: Option<Arc<dyn StorageEstimator>>,
        network: Arc<dyn Network>, registrar: Arc<dyn Registrar>,
    ) -> Self {
        let guard = Arc::new(UnregisterGuard::new(registrar.clone()));
        let router = Router::new(config.api_cache_enabled, config.api_allowlist.clone());
        let orchestrator = Orchestrator::new(
            router,
            config.never_cache_paths.clone(),
            store.clone(),
            network.clone(),
            guard.clone(),
        )
        .with_success_only(config.cache_success_only);
        let lifecycle = Arc::new(Lifecycle::new(
            store.clone(),
            estimator.clone(),
            guard,
            config.memory_limit_bytes(),
            config.budget_scope,
        ));
        let (phase, _) = watch::channel(Phase::Installed);

        Self {
            orchestrator,
            lifecycle,
            registrar,
            store,
            estimator,
            network,
            phase,
            timers: Mutex::new(None),
            intercept_insecure: config.intercept_insecure,
            budget_interval: config.budget_interval(),
            crucial_interval: config.crucial_interval(),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn is_registered(&self) -> bool {
        self.registrar.is_registered()
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn estimator(&self) -> Option<&Arc<dyn StorageEstimator>> {
        self.estimator.as_ref()
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Handle the install event.
    ///
    /// Skips waiting: the new version supersedes any running one at once,
    /// so interception pauses until the next activation.
    pub fn install(&self) {
        let previous = self.phase.send_replace(Phase::Installed);
        tracing::info!(?previous, "cache engine installed; skipping wait");
    }

    /// Handle the activate event.
    ///
    /// Interception starts only after the stale-partition sweep returns.
    pub async fn activate(&self) -> Vec<Partition> {
        self.phase.send_replace(Phase::Activating);
        let deleted = self.lifecycle.activation_sweep().await;
        self.phase.send_replace(Phase::Active);
        tracing::info!(swept = deleted.len(), "cache engine active");
        deleted
    }

    /// Start the periodic budget and crucial-refresh tasks.
    ///
    /// Calling this again restarts both timers.
    pub fn start_timers(&self) {
        let timers = self.lifecycle.spawn_timers(self.budget_interval, self.crucial_interval);
        match self.timers.lock() {
            Ok(mut slot) => *slot = Some(timers),
            Err(poisoned) => *poisoned.into_inner() = Some(timers),
        }
        tracing::debug!(
            budget_secs = self.budget_interval.as_secs(),
            crucial_secs = self.crucial_interval.as_secs(),
            "cache timers started"
        );
    }

    /// Whether a request would be routed through the cache right now.
    pub fn intercepts(&self, request: &Request) -> bool {
        request.is_get()
            && is_interceptable_scheme(&request.url, self.intercept_insecure)
            && self.phase() == Phase::Active
            && self.registrar.is_registered()
    }

    /// Handle a fetch event.
    pub async fn on_fetch(&self, request: Request) -> FetchOutcome {
        if !self.intercepts(&request) {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepting request");
            return FetchOutcome::NotIntercepted;
        }
        FetchOutcome::Handled(self.orchestrator.handle(request).await)
    }

    /// Handle a fetch event, falling back to a plain network fetch when the
    /// engine does not intercept it.
    pub async fn fetch(&self, request: Request) -> Result<Served, Error> {
        match self.on_fetch(request.clone()).await {
            FetchOutcome::Handled(result) => result,
            FetchOutcome::NotIntercepted => {
                let response = self.network.fetch(&request).await?;
                Ok(Served {
                    response,
                    source: Source::Bypass,
                    category: respcache_core::Category::PassThrough,
                    partition: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{CountingRegistrar, FlakyStore, ScriptedNetwork};
    use respcache_core::{MemoryStore, Response};
    use std::sync::atomic::Ordering;
    use url::Url;

    struct Fixture {
        engine: Engine,
        store: Arc<FlakyStore>,
        network: Arc<ScriptedNetwork>,
        registrar: Arc<CountingRegistrar>,
    }

    fn fixture(config: AppConfig) -> Fixture {
        let store = Arc::new(FlakyStore::default());
        let network = Arc::new(ScriptedNetwork::default());
        let registrar = Arc::new(CountingRegistrar::default());
        let engine = Engine::new(&config, store.clone(), None, network.clone(), registrar.clone());
        Fixture { engine, store, network, registrar }
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_not_intercepted_before_activation() {
        let fx = fixture(AppConfig::default());
        fx.engine.install();
        assert_eq!(fx.engine.phase(), Phase::Installed);
        assert!(matches!(
            fx.engine.on_fetch(get("https://app.example.com/index.html")).await,
            FetchOutcome::NotIntercepted
        ));

        fx.engine.activate().await;
        assert_eq!(fx.engine.phase(), Phase::Active);
        assert!(matches!(
            fx.engine.on_fetch(get("https://app.example.com/index.html")).await,
            FetchOutcome::Handled(Ok(_))
        ));
    }

    #[tokio::test]
    async fn test_non_get_not_intercepted() {
        let fx = fixture(AppConfig::default());
        fx.engine.activate().await;

        let post = Request::new("POST", Url::parse("https://app.example.com/index.html").unwrap());
        assert!(matches!(fx.engine.on_fetch(post).await, FetchOutcome::NotIntercepted));
        assert_eq!(fx.network.calls(), 0);
    }

    #[tokio::test]
    async fn test_insecure_scheme_not_intercepted() {
        let fx = fixture(AppConfig::default());
        fx.engine.activate().await;
        assert!(matches!(
            fx.engine.on_fetch(get("http://app.example.com/index.html")).await,
            FetchOutcome::NotIntercepted
        ));

        let fx = fixture(AppConfig { intercept_insecure: true, ..Default::default() });
        fx.engine.activate().await;
        assert!(fx.engine.intercepts(&get("http://app.example.com/index.html")));
    }

    #[tokio::test]
    async fn test_activation_clears_previous_partitions() {
        let fx = fixture(AppConfig::default());
        fx.store
            .inner
            .put(Partition::Markup, &get("https://app.example.com/index.html"), Response::new(200, "old"))
            .await
            .unwrap();

        fx.engine.install();
        let swept = fx.engine.activate().await;
        assert_eq!(swept, vec![Partition::Markup]);

        let served = fx.engine.fetch(get("https://app.example.com/index.html")).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_ne!(served.response.body, bytes::Bytes::from_static(b"old"));
    }

    #[tokio::test]
    async fn test_open_failure_unregisters_and_stops_interception() {
        let fx = fixture(AppConfig::default());
        fx.engine.activate().await;
        fx.store.fail_open.store(true, Ordering::SeqCst);

        let outcome = fx.engine.on_fetch(get("https://app.example.com/app.css")).await;
        assert!(matches!(outcome, FetchOutcome::Handled(Err(_))));
        assert_eq!(fx.registrar.calls(), 1);
        assert!(!fx.engine.is_registered());

        let served = fx.engine.fetch(get("https://app.example.com/app.css")).await.unwrap();
        assert_eq!(served.source, Source::Bypass);
        assert_eq!(fx.registrar.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_network() {
        let fx = fixture(AppConfig::default());
        let served = fx.engine.fetch(get("https://app.example.com/index.html")).await.unwrap();
        assert_eq!(served.source, Source::Bypass);
        assert_eq!(fx.network.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_only_config_reaches_orchestrator() {
        let fx = fixture(AppConfig { cache_success_only: true, ..Default::default() });
        fx.engine.activate().await;
        fx.network.respond("https://app.example.com/gone.css", Response::new(410, "gone"));

        let served = fx.engine.fetch(get("https://app.example.com/gone.css")).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_eq!(fx.store.inner.entry_count(Partition::Styles).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_timers_runs_crucial_refresh() {
        let store = Arc::new(MemoryStore::default());
        let network = Arc::new(ScriptedNetwork::default());
        let config = AppConfig { crucial_interval_secs: 60, ..Default::default() };
        let engine = Engine::new(&config, store.clone(), None, network, Arc::new(InProcessRegistrar::new()));
        engine.activate().await;
        engine.start_timers();

        engine.fetch(get("https://app.example.com/index.html")).await.unwrap();
        engine.fetch(get("https://app.example.com/app.css")).await.unwrap();
        assert_eq!(store.keys().await.unwrap().len(), 2);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(store.keys().await.unwrap(), vec!["app-css".to_string()]);
    }
}
