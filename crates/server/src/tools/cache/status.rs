//! cache_status tool implementation.
//!
//! Reports the worker's lifecycle state and every cache partition.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uninav_client::{Worker, WorkerState};
use uninav_core::{Error, PartitionInfo};

/// Parameters for the cache_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusParams {}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatusOutput {
    pub state: WorkerState,
    /// Whether requests currently go through the caches.
    pub controlling: bool,
    pub cache_version: String,
    /// Partitions this version keeps on activate.
    pub allow_list: Vec<String>,
    /// Every partition in the store, with entry counts.
    pub partitions: Vec<PartitionInfo>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(worker: &Worker, _params: CacheStatusParams) -> Result<CallToolResult, McpError> {
    let state = worker.state().await;
    let output = CacheStatusOutput {
        controlling: state == WorkerState::Activated,
        state,
        cache_version: worker.config().cache_version.clone(),
        allow_list: worker.cache_names().allow_list(),
        partitions: worker.cache().partitions().await?,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_worker;

    #[tokio::test]
    async fn test_status_after_activate() {
        let worker = offline_worker().await;
        worker.cache().open_partition("uninav-tiles-v0").await.unwrap();

        let result = status_impl(&worker, CacheStatusParams::default()).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: CacheStatusOutput = serde_json::from_str(text).unwrap();

        assert_eq!(output.state, WorkerState::Activated);
        assert!(output.controlling);
        assert_eq!(output.allow_list, vec!["uninav-app-v1".to_string(), "uninav-tiles-v1".to_string()]);

        let names: Vec<_> = output.partitions.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"uninav-app-v1"));
        assert!(names.contains(&"uninav-tiles-v0"));
    }
}
