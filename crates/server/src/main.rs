//! respcache server entry point.
//!
//! Boots the cache engine (install, activate, timers) and serves it as an MCP
//! server on stdio transport. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use respcache_client::{Engine, FetchClient, FetchConfig, InProcessRegistrar};
use respcache_core::{AppConfig, CacheDb, CacheStore, MemoryStore, StorageEstimator, StoreBackend};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let engine = Arc::new(build_engine(&config).await?);

    engine.install();
    engine.activate().await;
    engine.start_timers();

    tracing::info!(store = ?config.store, "Starting respcache server on stdio transport");

    let handler = handler::CacheServer::new(engine);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Wire the configured store, the network client and the registrar into an
/// engine.
async fn build_engine(config: &AppConfig) -> Result<Engine> {
    let fetch_config = FetchConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
        ..Default::default()
    };
    let network = Arc::new(FetchClient::new(fetch_config)?);
    let registrar = Arc::new(InProcessRegistrar::new());

    let (store, estimator): (Arc<dyn CacheStore>, Arc<dyn StorageEstimator>) = match config.store {
        StoreBackend::Sqlite => {
            let db = Arc::new(CacheDb::open(&config.db_path).await?.with_quota(config.quota_bytes()));
            tracing::debug!(path = %config.db_path.display(), "opened cache database");
            (db.clone(), db)
        }
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new(config.quota_bytes()));
            (store.clone(), store)
        }
    };

    Ok(Engine::new(config, store, Some(estimator), network, registrar))
}
