//! Error handling for the MCP server

use flowbridge_core::CoreError;
use thiserror::Error;

use crate::jsonrpc::JsonRpcError;

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, Error)]
pub enum McpError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// Convert to JSON-RPC error
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            McpError::Core(
                CoreError::UnknownTool(_)
                | CoreError::MissingParameter(_)
                | CoreError::FileNotFound(_),
            )
            | McpError::InvalidArguments(_)
            | McpError::Serialization(_) => JsonRpcError::invalid_params(self.to_string()),
            _ => JsonRpcError::internal_error(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{INTERNAL_ERROR, INVALID_PARAMS};

    #[test]
    fn unknown_tool_maps_to_invalid_params() {
        let err: McpError = CoreError::UnknownTool("nonexistent".into()).into();
        let rpc = err.to_jsonrpc_error();
        assert_eq!(rpc.code, INVALID_PARAMS);
        assert_eq!(rpc.message, "Unknown tool: nonexistent");
    }

    #[test]
    fn missing_parameter_maps_to_invalid_params() {
        let err: McpError = CoreError::MissingParameter("file".into()).into();
        assert_eq!(err.to_jsonrpc_error().code, INVALID_PARAMS);
    }

    #[test]
    fn io_failure_maps_to_internal_error() {
        let err: McpError =
            CoreError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")).into();
        assert_eq!(err.to_jsonrpc_error().code, INTERNAL_ERROR);
    }
}
