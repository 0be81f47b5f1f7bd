//! cache_status tool implementation.
//!
//! Lists partitions with their estimated usage.

use respcache_client::Engine;
use respcache_core::Partition;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Usage figures for one stored partition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionStatus {
    /// Storage name, e.g. "app-css".
    pub name: String,
    /// The partition this name belongs to, if the engine owns it.
    pub partition: Option<Partition>,
    /// Cleared by the periodic crucial refresh.
    pub crucial: bool,
    /// Estimated bytes used, when an estimator is configured.
    pub usage_bytes: Option<u64>,
}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    /// Whether requests are still routed through the cache.
    pub registered: bool,
    /// Engine phase: "installed", "activating" or "active".
    pub phase: String,
    pub partitions: Vec<PartitionStatus>,
    pub total_usage_bytes: Option<u64>,
    pub quota_bytes: Option<u64>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let names = engine.store().keys().await?;
    let estimator = engine.estimator();

    let mut partitions = Vec::with_capacity(names.len());
    for name in names {
        let partition = Partition::from_name(&name);
        let usage_bytes = match (estimator, partition) {
            (Some(estimator), Some(partition)) => Some(estimator.estimate(Some(partition)).await?.usage),
            _ => None,
        };
        let crucial = partition.is_some_and(Partition::is_crucial);
        partitions.push(PartitionStatus { name, partition, crucial, usage_bytes });
    }

    let total = match estimator {
        Some(estimator) => Some(estimator.estimate(None).await?),
        None => None,
    };

    let output = CacheStatusOutput {
        registered: engine.is_registered(),
        phase: format!("{:?}", engine.phase()).to_lowercase(),
        partitions,
        total_usage_bytes: total.map(|t| t.usage),
        quota_bytes: total.map(|t| t.quota),
    };

    json_result(&output)
}
