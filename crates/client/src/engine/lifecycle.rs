//! Partition lifecycle: activation sweep, budget eviction and crucial refresh.
//!
//! Eviction always removes whole partitions. Nothing here tracks individual
//! entries; each run recomputes its decision from current storage.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use respcache_core::{BudgetScope, CacheStore, MB, Partition, StorageEstimator};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::guard::UnregisterGuard;

/// Owns the periodic tasks. Dropping it stops both timers.
pub struct Timers {
    handles: Vec<JoinHandle<()>>,
}

impl Timers {
    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|h| !h.is_finished())
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

pub struct Lifecycle {
    store: Arc<dyn CacheStore>,
    estimator: Option<Arc<dyn StorageEstimator>>,
    guard: Arc<UnregisterGuard>,
    memory_limit: u64,
    scope: BudgetScope,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn CacheStore>, estimator: Option<Arc<dyn StorageEstimator>>, guard: Arc<UnregisterGuard>,
        memory_limit: u64, scope: BudgetScope,
    ) -> Self {
        Self { store, estimator, guard, memory_limit, scope }
    }

    /// Names of existing partitions this engine owns.
    ///
    /// A failure to list is logged and trips the guard.
    async fn owned_partitions(&self) -> Option<Vec<Partition>> {
        match self.store.keys().await {
            Ok(keys) => Some(keys.iter().filter_map(|k| Partition::from_name(k)).collect()),
            Err(e) => {
                tracing::error!(error = %e, "failed to read cache partitions");
                self.guard.trigger_unregister().await;
                None
            }
        }
    }

    /// Delete `partitions` concurrently, returning the ones that existed.
    async fn delete_all(&self, partitions: &[Partition]) -> Vec<Partition> {
        let results = join_all(partitions.iter().map(|p| self.store.delete(p.name()))).await;

        partitions
            .iter()
            .zip(results)
            .filter_map(|(partition, result)| match result {
                Ok(true) => Some(*partition),
                Ok(false) => None,
                Err(e) => {
                    tracing::warn!(error = %e, %partition, "failed to delete cache partition");
                    None
                }
            })
            .collect()
    }

    /// Delete every owned partition. Runs once per activation.
    pub async fn activation_sweep(&self) -> Vec<Partition> {
        let Some(partitions) = self.owned_partitions().await else {
            return Vec::new();
        };
        let deleted = self.delete_all(&partitions).await;
        tracing::info!(deleted = deleted.len(), "activation sweep finished");
        deleted
    }

    /// Delete partitions whose estimated usage exceeds the memory ceiling.
    ///
    /// Without an estimator this is a no-op.
    pub async fn enforce_budget(&self) -> Vec<Partition> {
        let Some(estimator) = &self.estimator else {
            tracing::debug!("no storage estimator; skipping budget check");
            return Vec::new();
        };
        let Some(partitions) = self.owned_partitions().await else {
            return Vec::new();
        };

        let mut deleted = Vec::new();
        for partition in partitions {
            let measured = match self.scope {
                BudgetScope::Partition => Some(partition),
                BudgetScope::Total => None,
            };

            let estimate = match estimator.estimate(measured).await {
                Ok(estimate) => estimate,
                Err(e) => {
                    tracing::error!(error = %e, %partition, "failed to read storage estimate");
                    self.guard.trigger_unregister().await;
                    continue;
                }
            };

            tracing::info!(
                %partition,
                used_mb = estimate.usage as f64 / MB as f64,
                quota_mb = estimate.quota as f64 / MB as f64,
                "cache storage usage"
            );

            if estimate.usage > self.memory_limit {
                match self.store.delete(partition.name()).await {
                    Ok(true) => deleted.push(partition),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(error = %e, %partition, "failed to evict cache partition"),
                }
            }
        }

        if !deleted.is_empty() {
            tracing::warn!(?deleted, limit_mb = self.memory_limit / MB, "evicted partitions over budget");
        }
        deleted
    }

    /// Delete the markup and data partitions regardless of usage.
    pub async fn refresh_crucial(&self) -> Vec<Partition> {
        let deleted = self.delete_all(&Partition::CRUCIAL).await;
        tracing::debug!(?deleted, "refreshed crucial partitions");
        deleted
    }

    /// Delete a single partition on demand.
    pub async fn purge(&self, partition: Partition) -> Result<bool, respcache_core::Error> {
        self.store.delete(partition.name()).await
    }

    /// Start the budget and crucial-refresh timers.
    ///
    /// The first run of each happens one full interval after the call.
    pub fn spawn_timers(self: &Arc<Self>, budget_every: Duration, crucial_every: Duration) -> Timers {
        let budget = {
            let lifecycle = Arc::clone(self);
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + budget_every, budget_every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    lifecycle.enforce_budget().await;
                }
            })
        };

        let crucial = {
            let lifecycle = Arc::clone(self);
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + crucial_every, crucial_every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    lifecycle.refresh_crucial().await;
                }
            })
        };

        Timers { handles: vec![budget, crucial] }
    }
}
