//! cache_fetch tool implementation.
//!
//! Sends a request through the cache engine and reports where the response
//! came from.

use chrono::Utc;
use respcache_client::{Engine, fetch::canonicalize};
use respcache_core::{Category, Error, Partition, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// The URL to fetch. A missing scheme defaults to https.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Maximum number of body characters returned (default: 100000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_chars() -> usize {
    100_000
}

/// Output structure for cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchOutput {
    /// The canonicalized URL that was requested.
    pub url: String,
    /// "cache", "network" or "bypass".
    pub source: String,
    /// Content category assigned by the classifier.
    pub category: Category,
    /// Partition the response was read from or written to.
    pub partition: Option<Partition>,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Body length in bytes before truncation.
    pub body_bytes: usize,
    /// Response headers in received order.
    pub headers: Vec<(String, String)>,
    /// Body as lossy UTF-8 text.
    pub body: String,
    /// Whether `body` was cut at `max_chars`.
    pub truncated: bool,
    /// ISO8601 timestamp of when the response was served.
    pub fetched_at: String,
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(engine: &Engine, params: CacheFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(params.method, url);

    tracing::debug!(method = %request.method, url = %request.url, "cache_fetch");

    let served = engine.fetch(request.clone()).await?;
    let response = served.response;

    let text = String::from_utf8_lossy(&response.body);
    let truncated = text.chars().count() > params.max_chars;
    let body: String = if truncated { text.chars().take(params.max_chars).collect() } else { text.into_owned() };

    let output = CacheFetchOutput {
        url: request.url.to_string(),
        source: served.source.as_str().to_string(),
        category: served.category,
        partition: served.partition,
        status: response.status,
        content_type: response.header("content-type").map(str::to_string),
        body_bytes: response.body.len(),
        headers: response.headers,
        body,
        truncated,
        fetched_at: Utc::now().to_rfc3339(),
    };

    json_result(&output)
}
