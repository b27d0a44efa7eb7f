//! MCP server shell over the dispatcher.
//!
//! The registry drives both `tools/list` and `tools/call`; every call
//! returns the dispatcher's uniform envelope serialized as JSON text
//! content, with the MCP error flag mirroring the envelope's `ok` field.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool, ToolAnnotations,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData, ServerHandler};
use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::error::{McpResult, McpServerError};
use crate::registry::ToolEntry;

/// MCP server for the legal-research gateway.
#[derive(Clone)]
pub struct GatewayServer {
    dispatcher: Dispatcher,
}

impl GatewayServer {
    /// Wrap a ready dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve the MCP protocol over stdio until the client disconnects.
    pub async fn serve_stdio(&self) -> McpResult<()> {
        tracing::info!("yargi MCP server starting");

        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();

        let service = rmcp::serve_server(self.clone(), (stdin, stdout))
            .await
            .map_err(|e| McpServerError::Protocol(e.to_string()))?;

        service
            .waiting()
            .await
            .map_err(|e| McpServerError::Protocol(e.to_string()))?;

        tracing::info!("yargi MCP server stopped");
        Ok(())
    }

    fn wire_tool(entry: &Arc<ToolEntry>) -> Tool {
        let schema = match &entry.descriptor.input_schema {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        let annotations = entry.descriptor.annotations;
        Tool {
            name: Cow::Borrowed(entry.descriptor.name),
            title: None,
            description: Some(Cow::Borrowed(entry.descriptor.description)),
            input_schema: Arc::new(schema),
            output_schema: None,
            annotations: Some(ToolAnnotations {
                title: None,
                read_only_hint: Some(annotations.read_only),
                destructive_hint: Some(false),
                idempotent_hint: Some(annotations.idempotent),
                open_world_hint: Some(annotations.open_world),
            }),
            icons: None,
        }
    }
}

impl ServerHandler for GatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "yargi-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Search Turkish legal databases (Yargıtay, Danıştay, Anayasa Mahkemesi, \
                 Sayıştay, KİK, Rekabet Kurumu, BDDK, KVKK, Uyuşmazlık Mahkemesi, UYAP Emsal, \
                 Bedesten) and fetch decisions as paginated Markdown."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self
            .dispatcher
            .registry()
            .entries()
            .map(Self::wire_tool)
            .collect();
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let args = request
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let envelope = self.dispatcher.dispatch(&request.name, args, None).await;
        let ok = envelope.ok;
        let text = serde_json::to_string(&envelope)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        let result = if ok {
            CallToolResult::success(vec![Content::text(text)])
        } else {
            CallToolResult::error(vec![Content::text(text)])
        };
        Ok(result)
    }
}
