//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::assets::{AssetFetchParams, fetch_impl, status_impl};
use crate::tools::photos::{PhotoCaptureParams, PhotoListParams, capture_impl, clear_impl, list_impl};

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
use shutter_client::AppContext;

/// The main MCP server handler for the gallery.
#[derive(Clone)]
pub struct GalleryServer {
    ctx: Arc<AppContext>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl GalleryServer {
    /// Create a new server handler over an opened context.
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Save a captured photo. Accepts a data:image/*;base64 URL or raw base64 bytes with a MIME type. Returns the stored id and timestamp."
    )]
    async fn photo_capture(&self, params: Parameters<PhotoCaptureParams>) -> Result<CallToolResult, McpError> {
        capture_impl(&self.ctx.photos, params.0).await
    }

    #[tool(description = "List every saved photo in capture order.")]
    async fn photo_list(&self, params: Parameters<PhotoListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.ctx.photos, params.0).await
    }

    #[tool(description = "Delete every saved photo. Returns the number removed.")]
    async fn photo_clear(&self) -> Result<CallToolResult, McpError> {
        clear_impl(&self.ctx.photos).await
    }

    /// Fetch an application asset through the cache.
    ///
    /// GET requests are answered from the current cache generation when possible;
    /// misses go to the network and same-origin 200 responses are stored.
    #[tool(
        description = "Fetch an application asset cache-first. Relative paths resolve against the app origin. Reports whether the response came from the cache or the network."
    )]
    async fn asset_fetch(&self, params: Parameters<AssetFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.ctx.assets, params.0).await
    }

    #[tool(description = "Show the current asset cache generation and every stored generation.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.ctx.assets).await
    }
}

impl ServerHandler for GalleryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shutter".into(),
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
