//! MCP server exposing the automation tool catalogue.

use crate::dispatch::Dispatcher;
use crate::session::SessionManager;
use crate::tool_registry::{self, ToolCategory};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use std::sync::Arc;
use tracing::{debug, info};

/// MCP server for browser and mobile automation
#[derive(Clone)]
pub struct AlumniumMcpServer {
    dispatcher: Dispatcher,
    mode: ServerMode,
}

#[derive(Clone, Copy, Debug)]
pub enum ServerMode {
    Stdio,
    Http,
}

impl AlumniumMcpServer {
    pub fn new(manager: Arc<SessionManager>, mode: ServerMode) -> Self {
        info!(?mode, "Creating Alumnium MCP server");
        Self {
            dispatcher: Dispatcher::new(manager),
            mode,
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        self.dispatcher.manager()
    }

    fn sharing_hint(&self) -> &'static str {
        match self.mode {
            ServerMode::Stdio => "Call quit_driver when done to close the browser or app.",
            ServerMode::Http => {
                "Handles are shared by every client of this server; only quit drivers you started."
            }
        }
    }

    fn instructions(&self) -> String {
        let categories: Vec<String> = ToolCategory::all()
            .iter()
            .map(|&cat| {
                let names: Vec<&str> = tool_registry::tools_by_category(cat)
                    .map(|t| t.name)
                    .collect();
                format!("- {}: {} ({})", cat.as_str(), cat.description(), names.join(", "))
            })
            .collect();
        format!(
            "Alumnium automation server for testing web and mobile apps in natural language. \
             \n\nWorkflow: \
             \n1. start_driver: Start a browser or iOS driver; keep the returned driver_handle \
             \n2. do / check / get: Act, verify, and extract on the current screen \
             \n3. area: Scope to one region and use area_do / area_check / area_get with the area_handle \
             \n4. save_cache: Optionally persist what was learned \
             \n5. quit_driver: Close the driver; its areas are released with it \
             \n\n{hint} \
             \n\nTool Categories: \
             \n{categories}",
            hint = self.sharing_hint(),
            categories = categories.join("\n"),
        )
    }

    fn tools() -> Vec<Tool> {
        tool_registry::all_tools()
            .map(tool_registry::to_mcp_tool)
            .collect()
    }
}

impl ServerHandler for AlumniumMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(self.instructions()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: Self::tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %params.name, "Tool call");
        let envelope = self
            .dispatcher
            .dispatch(&params.name, params.arguments, ctx.ct.clone())
            .await;
        Ok(envelope.into_tool_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[test]
    fn lists_the_whole_catalogue() {
        let tools = AlumniumMcpServer::tools();
        assert_eq!(tools.len(), tool_registry::TOOL_REGISTRY.len());
        assert_eq!(tools[0].name, "start_driver");
    }

    #[test]
    fn info_advertises_tools_and_workflow() {
        let h = Harness::new();
        let server = AlumniumMcpServer::new(h.manager.clone(), ServerMode::Stdio);
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        let instructions = info.instructions.unwrap_or_default();
        assert!(instructions.contains("start_driver"));
        assert!(instructions.contains("quit_driver"));
        assert!(instructions.contains("areas: "));
    }
}
