//! MCP tool implementations.
//!
//! This module contains all tools exposed by the respcache server.

pub mod cache;
pub mod fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use respcache_core::Error;
use serde::Serialize;

/// Serialize a tool output as a pretty JSON text block.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
