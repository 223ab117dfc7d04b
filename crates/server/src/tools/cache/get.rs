//! cache_get tool implementation.
//!
//! Looks up one stored response by cache name and request URL. The URL is
//! normalized the way intercepted requests are, so a path, a missing
//! trailing slash, or a fragment still finds the stored entry.

use qrsw_client::ServiceWorker;
use qrsw_client::fetch::resolve;
use qrsw_core::{Error, ResponsePayload};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Cache name, e.g. "qr-generator-v2.0.0-static".
    pub cache: String,

    /// Request URL, absolute or relative to the application root.
    pub url: String,

    /// Request method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub cache: String,
    /// The normalized URL the entry was looked up under.
    pub url: String,
    pub response: ResponsePayload,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &ServiceWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.config().root, &params.url)
        .map_err(|e| ToolError::InvalidUrl(format!("{}: {e}", params.url.trim())))?;
    let method = params.method.as_deref().unwrap_or("GET").to_ascii_uppercase();

    let response = worker
        .db()
        .match_entry(&params.cache, url.as_str(), &method)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} {} in {}", method, url, params.cache)))?;

    json_result(&CacheGetOutput { cache: params.cache, url: url.to_string(), response })
}
