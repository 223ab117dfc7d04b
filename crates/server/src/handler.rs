//! MCP server handler implementation.
//!
//! The server owns one `ServiceWorker` and routes each tool call to the
//! worker event it stands for.
use crate::tools::cache::{CacheGetParams, get_impl, list_impl};
use crate::tools::events::{
    SwMessageParams, SwNotificationClickParams, SwPushParams, SwSyncParams, message_impl, notification_click_impl,
    push_impl, sync_impl,
};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};

use qrsw_client::ServiceWorker;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for qr-offline.
#[derive(Clone)]
pub struct OfflineCacheServer {
    worker: ServiceWorker,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl OfflineCacheServer {
    pub fn new(worker: ServiceWorker) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Deliver an intercepted request to the worker. Returns the request class, the strategy used, and the response (cached, fresh, or a synthesized 503)."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Install this worker version: fetch every manifest asset into the static cache, all or nothing.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate this worker version: delete caches of older versions and claim open clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(
        description = "Deliver a background sync (tag qr-generate) or, with periodic=true, a periodic sync (tag qr-cache-refresh)."
    )]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. The worker shows a notification with the payload as its body.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a notification click. The explore action opens the application.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a page message to the worker. {\"type\": \"SKIP_WAITING\"} activates a waiting version.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "List every named cache with its entry count.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.worker.db()).await
    }

    #[tool(
        description = "Read one stored response from a named cache. The URL may be absolute or relative to the application root; fragments are ignored."
    )]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for OfflineCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "qr-offline".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::test_worker;

    #[tokio::test]
    async fn test_router_lists_every_tool() {
        let (worker, _) = test_worker().await;
        let server = OfflineCacheServer::new(worker);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_list",
                "sw_activate",
                "sw_fetch",
                "sw_install",
                "sw_message",
                "sw_notification_click",
                "sw_push",
                "sw_sync",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, _) = test_worker().await;
        let info = OfflineCacheServer::new(worker).get_info();
        assert_eq!(info.server_info.name, "qr-offline");
    }
}
