//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use std::sync::Arc;

use crate::tools::{
    PostMessageParams, WorkerFetchParams,
    cache::{CacheMatchParams, CacheStatusParams, match_impl, status_impl},
    post_message::post_message_impl,
    worker_fetch::fetch_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use uninav_client::Worker;

/// The main MCP server handler for the uninav worker.
#[derive(Clone)]
pub struct UninavServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<Worker>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl UninavServer {
    /// Create a new server handler around an installed worker.
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { tool_router: Self::tool_router(), worker }
    }

    /// Route a request through the worker.
    ///
    /// Tiles come from cache first, navigations and other requests go to the network first.
    /// Offline failures resolve to placeholders or 503 responses, never errors.
    #[tool(
        description = "Route a request through the offline worker. Returns status, content type, request class, and whether the answer came from cache, network, or an offline fallback."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// Post a control message (PREFETCH_TILES, CLEAR_TILE_CACHE, SKIP_WAITING).
    #[tool(
        description = "Post a control message to the worker: PREFETCH_TILES (bbox + zooms, or urls), CLEAR_TILE_CACHE, or SKIP_WAITING. Returns the events broadcast to clients while handling it."
    )]
    async fn post_message(&self, params: Parameters<PostMessageParams>) -> Result<CallToolResult, McpError> {
        post_message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Show the worker lifecycle state and every cache partition with its entry count.")]
    async fn cache_status(&self, params: Parameters<CacheStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker, params.0).await
    }

    /// Look a request up in the caches without touching the network.
    #[tool(
        description = "Check whether a GET request is cached. Optionally restrict to one partition and ignore the query string."
    )]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for UninavServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "uninav-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
