//! cache_list tool implementation.

use qrsw_core::{CacheDb, CacheSummary};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Every named cache, oldest first.
    pub caches: Vec<CacheSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb) -> Result<CallToolResult, McpError> {
    let caches = cache.cache_summaries().await?;
    json_result(&CacheListOutput { caches })
}
