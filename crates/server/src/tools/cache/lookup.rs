//! cache_match tool implementation.
//!
//! Looks a request up in the worker's caches without touching the network.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uninav_client::{Worker, resolve};
use uninav_core::{Error, MatchOptions};

use crate::error::ToolError;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path relative to the worker's origin.
    pub url: String,

    /// Partition to search. Searches every partition when omitted.
    #[serde(default)]
    pub partition: Option<String>,

    /// Match regardless of query string.
    #[serde(default)]
    pub ignore_search: bool,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMatchOutput {
    pub url: String,
    pub found: bool,
    /// URL the entry was stored under, which differs from `url` when the query was ignored.
    pub stored_url: Option<String>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub size: Option<usize>,
    pub stored_at: Option<String>,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(worker: &Worker, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(worker.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let options = MatchOptions { ignore_search: params.ignore_search };
    let cache = worker.cache();

    let entry = match params.partition.as_deref() {
        Some(partition) => {
            if !cache.has_partition(partition).await? {
                return Err(ToolError::UnknownPartition(partition.to_string()).into());
            }
            cache.match_entry(partition, "GET", &url, options).await?
        }
        None => cache.match_any("GET", &url, options).await?,
    };

    let output = CacheMatchOutput {
        url: url.to_string(),
        found: entry.is_some(),
        stored_url: entry.as_ref().map(|e| e.url.clone()),
        status: entry.as_ref().map(|e| e.status),
        content_type: entry.as_ref().and_then(|e| e.content_type.clone()),
        size: entry.as_ref().map(|e| e.body.len()),
        stored_at: entry.map(|e| e.stored_at),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize match: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
