//! cache_purge tool implementation.
//!
//! Deletes partitions by name, the crucial set, or everything the engine owns.

use respcache_client::Engine;
use respcache_core::{Error, Partition};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition to delete: a storage name ("app-css") or short name ("styles").
    pub partition: Option<String>,

    /// Delete the markup and data partitions.
    #[serde(default)]
    pub crucial: bool,

    /// Delete every partition the engine owns.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Partitions that existed and were deleted.
    pub deleted: Vec<Partition>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(engine: &Engine, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.partition.is_none() && !params.crucial && !params.all {
        return Err(Error::InvalidInput("At least one of partition, crucial, or all must be specified".to_string()).into());
    }

    let lifecycle = engine.lifecycle();
    let mut deleted = Vec::new();

    if params.all {
        deleted.extend(lifecycle.activation_sweep().await);
    } else {
        if let Some(name) = params.partition {
            let partition: Partition = name.parse()?;
            if lifecycle.purge(partition).await? {
                deleted.push(partition);
            }
        }

        if params.crucial {
            for partition in lifecycle.refresh_crucial().await {
                if !deleted.contains(&partition) {
                    deleted.push(partition);
                }
            }
        }
    }

    tracing::info!(?deleted, "cache_purge");

    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fetch::{CacheFetchParams, fetch_impl};
    use crate::tools::test_support::{Harness, harness, parse};
    use respcache_core::CacheStore;

    async fn populate(h: &Harness) {
        for url in [
            "https://app.example.com/app.css",
            "https://app.example.com/index.html",
            "https://app.example.com/data.json",
        ] {
            let params = CacheFetchParams { url: url.into(), method: "GET".into(), max_chars: 100 };
            fetch_impl(&h.engine, params).await.unwrap();
        }
    }

    fn params(partition: Option<&str>, crucial: bool, all: bool) -> CachePurgeParams {
        CachePurgeParams { partition: partition.map(str::to_string), crucial, all }
    }

    #[tokio::test]
    async fn test_purge_by_name() {
        let h = harness().await;
        populate(&h).await;

        let output: CachePurgeOutput = parse(&purge_impl(&h.engine, params(Some("app-css"), false, false)).await.unwrap());
        assert_eq!(output.deleted, vec![Partition::Styles]);
        assert!(!h.store.keys().await.unwrap().contains(&"app-css".to_string()));

        let output: CachePurgeOutput = parse(&purge_impl(&h.engine, params(Some("styles"), false, false)).await.unwrap());
        assert!(output.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_purge_crucial() {
        let h = harness().await;
        populate(&h).await;

        let output: CachePurgeOutput = parse(&purge_impl(&h.engine, params(None, true, false)).await.unwrap());
        assert_eq!(output.deleted.len(), 2);
        assert!(output.deleted.contains(&Partition::Markup));
        assert!(output.deleted.contains(&Partition::Data));
        assert_eq!(h.store.keys().await.unwrap(), vec!["app-css".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_all() {
        let h = harness().await;
        populate(&h).await;

        let output: CachePurgeOutput = parse(&purge_impl(&h.engine, params(None, false, true)).await.unwrap());
        assert_eq!(output.deleted.len(), 3);
        assert!(h.store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_unknown_partition() {
        let h = harness().await;
        let result = purge_impl(&h.engine, params(Some("app-bogus"), false, false)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let h = harness().await;
        let result = purge_impl(&h.engine, params(None, false, false)).await;
        assert!(result.is_err());
    }
}
