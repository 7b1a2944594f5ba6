//! Errors raised by the MCP layer before a request reaches the worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Tool-level errors for the uninav server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A `post_message` payload that isn't a control message.
    #[error("INVALID_MESSAGE: {0}")]
    InvalidMessage(String),

    /// An HTTP method the worker can't route.
    #[error("INVALID_METHOD: {0}")]
    InvalidMethod(String),

    /// Unknown cache partition.
    #[error("UNKNOWN_PARTITION: {0}")]
    UnknownPartition(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidMessage(_) | ToolError::InvalidMethod(_) => -32602,
            ToolError::UnknownPartition(_) => -32001,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let err: McpError = ToolError::InvalidMessage("missing type".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert!(err.message.contains("INVALID_MESSAGE"));

        let err: McpError = ToolError::UnknownPartition("uninav-tiles-v0".into()).into();
        assert_eq!(err.code, ErrorCode(-32001));
    }
}
