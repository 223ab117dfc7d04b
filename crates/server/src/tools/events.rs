//! Event tools: sw_sync, sw_push, sw_notification_click, sw_message.
//!
//! These never fail on worker faults; the worker absorbs and logs them,
//! and the output reports what happened.

use qrsw_client::{Notification, RefreshReport, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag, e.g. "qr-generate" or "qr-cache-refresh".
    pub tag: String,

    /// Deliver as a periodic sync instead of a one-off background sync.
    #[serde(default)]
    pub periodic: bool,
}

/// Output from the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    pub tag: String,
    /// False when the tag is not one the worker listens for.
    pub recognized: bool,
    /// Assets refreshed by a periodic sync.
    #[serde(default)]
    pub refreshed: Vec<String>,
    /// Assets that could not be refreshed.
    #[serde(default)]
    pub failed: Vec<String>,
}

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push message text. Omit for the default update message.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    pub shown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Action identifiers offered on the notification.
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Input parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Clicked action ("explore", "close"), or omitted for the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Output from the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickOutput {
    pub opened_window: bool,
}

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message posted by a page, e.g. {"type": "SKIP_WAITING"}.
    pub message: serde_json::Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    pub recognized: bool,
    pub state: String,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(worker: &ServiceWorker, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.trim().to_string();
    if tag.is_empty() {
        return Err(ToolError::InvalidInput("tag must not be empty".into()).into());
    }

    let output = if params.periodic {
        match worker.on_periodic_sync(&tag).await {
            Some(RefreshReport { refreshed, failed }) => SwSyncOutput { tag, recognized: true, refreshed, failed },
            None => SwSyncOutput { tag, recognized: false, refreshed: Vec::new(), failed: Vec::new() },
        }
    } else {
        let recognized = worker.on_sync(&tag).await;
        SwSyncOutput { tag, recognized, refreshed: Vec::new(), failed: Vec::new() }
    };

    json_result(&output)
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &ServiceWorker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let output = match worker.on_push(params.payload.as_deref()).await {
        Some(Notification { title, body, actions, .. }) => SwPushOutput {
            shown: true,
            title: Some(title),
            body: Some(body),
            actions: actions.into_iter().map(|a| a.action).collect(),
        },
        None => SwPushOutput { shown: false, title: None, body: None, actions: Vec::new() },
    };

    json_result(&output)
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(
    worker: &ServiceWorker, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let opened_window = worker.on_notification_click(params.action.as_deref()).await;
    json_result(&SwNotificationClickOutput { opened_window })
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &ServiceWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let recognized = worker.on_message(&params.message).await;
    let output = SwMessageOutput { recognized, state: worker.state().await.to_string() };
    json_result(&output)
}
