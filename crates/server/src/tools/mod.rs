//! MCP tool implementations.
//!
//! Each worker event the browser would deliver is exposed as a tool; the
//! host calling the tools plays the part of the browser.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Encode a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
