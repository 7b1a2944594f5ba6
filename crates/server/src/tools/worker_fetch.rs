//! worker_fetch tool implementation.
//!
//! Routes one request through the worker as if a controlled page issued it.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uninav_client::{FetchRequest, Method, RequestClass, RequestMode, ResponseSource, Worker, resolve};
use uninav_core::Error;

use crate::error::ToolError;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path relative to the worker's origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Issue the request as a page navigation.
    #[serde(default)]
    pub navigate: bool,
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerFetchOutput {
    /// The resolved request URL.
    pub url: String,
    pub method: String,
    /// How the worker classified the request.
    pub class: RequestClass,
    /// Where the response came from.
    pub source: ResponseSource,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    /// Body text, for textual content types only.
    pub text: Option<String>,
}

fn parse_method(method: Option<&str>) -> Result<Method, ToolError> {
    match method.map(str::trim) {
        None | Some("") => Ok(Method::GET),
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| ToolError::InvalidMethod(m.into())),
    }
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(worker.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = parse_method(params.method.as_deref())?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::default() };

    let request = FetchRequest::new(method, url, mode);
    let response = worker.handle_fetch(&request).await;
    tracing::debug!(url = %request.url, class = ?response.class, source = ?response.source, "worker_fetch");

    let output = WorkerFetchOutput {
        url: request.url.to_string(),
        method: request.method.to_string(),
        class: response.class,
        source: response.source,
        status: response.status.as_u16(),
        content_type: response.content_type.clone(),
        body_bytes: response.body.len(),
        text: response.text(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
