//! sw_fetch tool implementation.
//!
//! Delivers one intercepted request to the worker and reports how it was
//! classified and what the worker answered.

use qrsw_client::fetch::Method;
use qrsw_client::{Request, RequestClass, ServiceWorker, Strategy};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the application root.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Whether this is a top-level navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Request body for mutating methods.
    #[serde(default)]
    pub body: Option<String>,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,

    /// False when the worker let the request through untouched.
    pub handled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<RequestClass>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,

    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Body decoded as UTF-8 (lossy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Build the request the worker will see.
fn build_request(worker: &ServiceWorker, params: SwFetchParams) -> Result<Request, ToolError> {
    let input = params.url.trim();
    if input.is_empty() {
        return Err(ToolError::InvalidInput("url must not be empty".into()));
    }

    let mut url = worker
        .config()
        .root
        .join(input)
        .map_err(|e| ToolError::InvalidUrl(format!("{input}: {e}")))?;
    url.set_fragment(None);

    let method = match params.method.as_deref().map(str::trim) {
        None | Some("") => Method::GET,
        Some(name) => Method::from_bytes(name.to_ascii_uppercase().as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("unsupported method: {name}")))?,
    };

    let mut request = Request::new(method, url);
    request.navigational = params.navigate;
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, params)?;
    let url = request.url.to_string();
    let class = worker.classify(&request);

    let output = match worker.on_fetch(request).await {
        Some(response) => SwFetchOutput {
            url,
            handled: true,
            class: Some(class),
            strategy: Some(class.strategy()),
            status: Some(response.status),
            body: Some(response.text()),
            status_text: Some(response.status_text),
            headers: response.headers,
        },
        None => SwFetchOutput {
            url,
            handled: false,
            class: None,
            strategy: None,
            status: None,
            status_text: None,
            headers: Vec::new(),
            body: None,
        },
    };

    json_result(&output)
}
