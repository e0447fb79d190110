//! The MCP tool server surface (tool-call path): translates each
//! `callTool(name, args)` into an `action` through the total,
//! compile-time `Action::for_tool` table, and bridges the result back
//! through MCP's content shapes.

use std::sync::Arc;

use bridge_protocol::{ACTION_CATALOG, Action, extract_image_blob};
use rmcp::ErrorData as McpError;
use rmcp::model::{
	CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ServerHandler;
use serde_json::{Value, json};
use tokio::sync::watch;

use super::link::{Mode, RouterLink};

/// Special tool that does not forward to the router (tool-call path):
/// in daemon mode it issues STATUS; in direct mode there is no daemon to
/// ask, so the answer comes from the locally tracked connection flag.
const STATUS_TOOL: &str = "browser_get_connection_status";

pub struct BridgeServer {
	link: Arc<RouterLink>,
	direct_connected: Option<watch::Receiver<bool>>,
}

impl BridgeServer {
	pub fn new(link: Arc<RouterLink>, direct_connected: Option<watch::Receiver<bool>>) -> Self {
		Self { link, direct_connected }
	}

	async fn connection_status(&self) -> CallToolResult {
		let (connected, mode) = match (&self.direct_connected, self.link.mode) {
			(Some(rx), Mode::Direct) => (*rx.borrow(), "direct"),
			_ => match self.link.status().await {
				Ok((connected, _active_sessions)) => (connected, "daemon"),
				Err(message) => return CallToolResult::error(vec![Content::text(message)]),
			},
		};

		let payload = json!({
			"connected": connected,
			"mode": mode,
			"sessionId": self.link.session_id,
		});
		CallToolResult::success(vec![Content::text(payload.to_string())])
	}
}

impl ServerHandler for BridgeServer {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			protocol_version: ProtocolVersion::LATEST,
			capabilities: ServerCapabilities::builder().enable_tools().build(),
			server_info: Implementation { name: "browser-bridge".to_string(), version: env!("CARGO_PKG_VERSION").to_string() },
			instructions: Some("Drives a browser tab bound to this MCP session through the browser_* tools.".to_string()),
		}
	}

	async fn list_tools(&self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>) -> Result<ListToolsResult, McpError> {
		let mut tools: Vec<Tool> = ACTION_CATALOG.iter().map(|spec| Tool::new(spec.tool, spec.description, Arc::new(action_params_schema()))).collect();
		tools.push(Tool::new(STATUS_TOOL, "Report whether the router/extension link is currently connected.", Arc::new(empty_schema())));
		Ok(ListToolsResult { next_cursor: None, tools })
	}

	async fn call_tool(&self, request: CallToolRequestParam, _context: RequestContext<RoleServer>) -> Result<CallToolResult, McpError> {
		if request.name.as_ref() == STATUS_TOOL {
			return Ok(self.connection_status().await);
		}

		let Some(action) = Action::for_tool(request.name.as_ref()) else {
			return Err(McpError::invalid_params(format!("unknown tool '{}'", request.name), None));
		};

		let params = request.arguments.map(Value::Object).unwrap_or_else(|| json!({}));
		let tab_id = params.get("tabId").and_then(Value::as_str).map(str::to_string);

		match self.link.call(action, params, tab_id).await {
			Ok(data) => Ok(wrap_result(data)),
			Err(message) => Ok(CallToolResult::error(vec![Content::text(message)])),
		}
	}
}

/// A screenshot-like result is re-wrapped into MCP's image content form;
/// all other results are stringified JSON.
fn wrap_result(data: Value) -> CallToolResult {
	match extract_image_blob(&data) {
		Some(blob) => CallToolResult::success(vec![Content::image(blob.base64_data, blob.mime_type)]),
		None => CallToolResult::success(vec![Content::text(data.to_string())]),
	}
}

/// The action executor owns the real per-action parameter schemas (spec
/// note "Dynamic dispatch on `action`" puts schema validation at the
/// executor boundary, not here); the helper only advertises an open
/// object shape so MCP clients accept whatever params an action needs.
fn action_params_schema() -> JsonObject {
	json!({"type": "object", "additionalProperties": true}).as_object().cloned().unwrap_or_default()
}

fn empty_schema() -> JsonObject {
	json!({"type": "object", "properties": {}}).as_object().cloned().unwrap_or_default()
}
