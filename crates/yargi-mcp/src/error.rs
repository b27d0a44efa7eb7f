//! Server-level errors with MCP error-code mapping.

use thiserror::Error;

/// Errors that can occur in the MCP server shell.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Gateway construction or adapter failure.
    #[error("gateway error: {0}")]
    Gateway(#[from] yargi_core::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol-level failure in the transport.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl McpServerError {
    /// Map to a JSON-RPC error code.
    pub const fn error_code(&self) -> i32 {
        match self {
            Self::Gateway(_) => -32603, // Internal error
            Self::Json(_) => -32700,    // Parse error
            Self::Protocol(_) => -32600, // Invalid request
        }
    }
}

/// Result type alias for server operations.
pub type McpResult<T> = Result<T, McpServerError>;
