//! sw_install and sw_activate tool implementations.

use qrsw_client::{ActivateReport, InstallReport, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    pub state: String,
    /// Static cache that received the manifest.
    pub cache: String,
    pub assets: Vec<String>,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateOutput {
    pub state: String,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    pub claimed: bool,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let InstallReport { cache, assets } = worker.on_install().await?;
    let output = SwInstallOutput { state: worker.state().await.to_string(), cache, assets };
    json_result(&output)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let ActivateReport { deleted, failed, claimed } = worker.on_activate().await?;
    let output = SwActivateOutput { state: worker.state().await.to_string(), deleted, failed, claimed };
    json_result(&output)
}
