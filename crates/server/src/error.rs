//! Tool-level errors for the qr-offline server.
//!
//! Worker and cache failures arrive as `qrsw_core::Error`; these cover
//! argument problems the host rejects before reaching the worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be resolved against the application root.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::InvalidUrl(msg) => (-32003, msg.clone()),
            ToolError::Serialize(e) => (-32603, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err: McpError = ToolError::InvalidInput("url is empty".into()).into();
        assert_eq!(err.code.0, -32602);
        assert_eq!(err.message, "url is empty");

        let err: McpError = ToolError::InvalidUrl("::".into()).into();
        assert_eq!(err.code.0, -32003);
    }
}
