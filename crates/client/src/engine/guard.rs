//! Self-unregistration fail-safe.
//!
//! When the store or the network fails in a way the engine cannot recover
//! from, it removes itself from request interception instead of serving a
//! broken cache. Later requests fall back to plain network fetches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use respcache_core::Error;

/// The registration that routes requests through the engine.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Whether requests are currently routed through the engine.
    fn is_registered(&self) -> bool;

    /// Remove the engine from request interception.
    ///
    /// Returns `false` if it was already unregistered.
    async fn unregister(&self) -> Result<bool, Error>;
}

/// Registration held in process memory.
#[derive(Debug)]
pub struct InProcessRegistrar {
    registered: AtomicBool,
}

impl InProcessRegistrar {
    pub fn new() -> Self {
        Self { registered: AtomicBool::new(true) }
    }
}

impl Default for InProcessRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registrar for InProcessRegistrar {
    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    async fn unregister(&self) -> Result<bool, Error> {
        Ok(self.registered.swap(false, Ordering::AcqRel))
    }
}

/// Trips the registrar at most once, no matter how many failures report in.
pub struct UnregisterGuard {
    registrar: Arc<dyn Registrar>,
    tripped: AtomicBool,
}

impl UnregisterGuard {
    pub fn new(registrar: Arc<dyn Registrar>) -> Self {
        Self { registrar, tripped: AtomicBool::new(false) }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Deregister the engine. Later calls are no-ops once it succeeds.
    ///
    /// A failed attempt re-arms the guard so the next failure retries.
    pub async fn trigger_unregister(&self) {
        if self.tripped.swap(true, Ordering::AcqRel) {
            return;
        }

        match self.registrar.unregister().await {
            Ok(true) => tracing::warn!("cache engine unregistered; requests now bypass the cache"),
            Ok(false) => tracing::debug!("cache engine was already unregistered"),
            Err(e) => {
                self.tripped.store(false, Ordering::Release);
                tracing::error!(error = %e, "failed to unregister cache engine");
            }
        }
    }
}
