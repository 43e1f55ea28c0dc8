use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, ErrorCode, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, ToolsCapability,
};
use rmcp::{RoleServer, ServerHandler, service::RequestContext};
use tracing::debug;

use crate::context::InvocationContext;
use crate::errors::McpError;
use crate::tools::{ForgeTool, ToolHandler};

/// The MCP handler shared by every session
#[derive(Clone)]
pub struct Running {
    name: String,
    version: String,
    tools: Arc<Vec<ForgeTool>>,
    handler: ToolHandler,
}

impl Running {
    pub fn new(name: String, version: String, tools: Vec<ForgeTool>, handler: ToolHandler) -> Self {
        Self {
            name,
            version,
            tools: Arc::new(tools),
            handler,
        }
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    fn list_tools_impl(&self) -> ListToolsResult {
        ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: self.tools.iter().map(|tool| tool.tool.clone()).collect(),
        }
    }

    /// Dispatch a call to the tool called `name`
    pub async fn call_tool_impl(
        &self,
        name: &str,
        context: InvocationContext,
    ) -> Result<CallToolResult, McpError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| tool_not_found(name))?;

        Ok(self.handler.call(&tool.definition, context).await)
    }
}

impl ServerHandler for Running {
    #[tracing::instrument(skip_all, fields(forge.tool_name = request.name.as_ref(), forge.request_id = %context.id.clone()))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let invocation = InvocationContext::from_request(request.arguments, &context.extensions);
        let result = self.call_tool_impl(&request.name, invocation).await;
        debug!(
            success = result.as_ref().is_ok_and(|r| r.is_error != Some(true)),
            "Tool call finished"
        );
        result
    }

    #[tracing::instrument(skip_all)]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(self.list_tools_impl())
    }

    fn get_info(&self) -> ServerInfo {
        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
            ..Default::default()
        };

        ServerInfo {
            server_info: Implementation {
                name: self.name.clone(),
                description: None,
                icons: None,
                title: None,
                version: self.version.clone(),
                website_url: None,
            },
            capabilities,
            ..Default::default()
        }
    }
}

fn tool_not_found(name: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Tool {name} not found"),
        None,
    )
}
