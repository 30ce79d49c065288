//! MCP server handler (stdio + Streamable HTTP) over the capability bridge.
//!
//! Prompts, resources and tools are only known after the configuration
//! directory is loaded, so this implements `ServerHandler` directly instead
//! of a compile-time tool router. Wire types that drift between rmcp
//! releases (prompt arguments, resource contents, content items) are built
//! through serde from the bridge's JSON shapes.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use rmcp::{
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam,
        GetPromptResult, Implementation, JsonObject, ListPromptsResult, ListResourcesResult,
        ListToolsResult, PaginatedRequestParam, Prompt, PromptArgument, PromptMessage,
        PromptMessageRole, RawResource, ReadResourceRequestParam, ReadResourceResult,
        ResourceContents, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};

use crate::bridge::{CapabilityBridge, PromptListing};
use crate::core::error::{GatewayError, UnknownCapability};
use crate::schema::PromptArgumentSpec;

#[derive(Clone)]
pub struct GatewaySvc {
    bridge: Arc<CapabilityBridge>,
}

impl GatewaySvc {
    pub fn new(bridge: Arc<CapabilityBridge>) -> Self {
        Self { bridge }
    }
}

/// Factory for transports that build one handler per session.
pub fn make_factory(bridge: Arc<CapabilityBridge>) -> impl Fn() -> GatewaySvc + Clone + Send + Sync + 'static {
    move || GatewaySvc::new(bridge.clone())
}

pub fn to_mcp_error(err: GatewayError) -> McpError {
    match &err {
        GatewayError::UnknownCapability(
            UnknownCapability::Resource(_)
            | UnknownCapability::ResourceFile { .. }
            | UnknownCapability::MalformedUri(_),
        ) => McpError::resource_not_found(err.to_string(), None),
        GatewayError::UnknownCapability(_) | GatewayError::InvalidArguments { .. } => {
            McpError::invalid_params(err.to_string(), None)
        }
        _ => McpError::internal_error(err.to_string(), None),
    }
}

/// rmcp's `PromptArgument` has no type or enum fields, so they ride in the
/// description instead: `Target language (string; one of: rust, go)`.
fn argument_description(arg: &PromptArgumentSpec) -> String {
    let mut hint = arg.kind.clone();
    if let Some(values) = &arg.enum_values {
        hint.push_str("; one of: ");
        hint.push_str(&values.join(", "));
    }
    if arg.description.is_empty() {
        format!("({hint})")
    } else {
        format!("{} ({hint})", arg.description)
    }
}

fn to_prompt(listing: PromptListing) -> Result<Prompt, McpError> {
    let arguments = listing
        .arguments
        .iter()
        .map(|a| {
            let mut value = serde_json::to_value(a)?;
            value["description"] = JsonValue::String(argument_description(a));
            serde_json::from_value::<PromptArgument>(value)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(Prompt::new(listing.name, Some(listing.description), Some(arguments)))
}

/// Tool output items are MCP content already; anything rmcp can't parse is
/// sent as text rather than dropped.
fn to_content(items: Vec<JsonValue>) -> Vec<Content> {
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<Content>(item.clone())
                .unwrap_or_else(|_| Content::text(item.to_string()))
        })
        .collect()
}

impl ServerHandler for GatewaySvc {
    fn get_info(&self) -> ServerInfo {
        let id = self.bridge.identity();
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: id.name,
                version: id.version,
                ..Default::default()
            },
            instructions: Some(
                "Capabilities loaded from a configuration directory: list and call tools, \
                 list and get prompts, list and read resources (uri `<resource>://<path>`)."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self
            .bridge
            .list_tools()
            .into_iter()
            .map(|t| {
                let schema = match t.input_schema {
                    JsonValue::Object(map) => map,
                    _ => JsonObject::new(),
                };
                Tool::new(t.name, t.description, Arc::new(schema))
            })
            .collect();
        Ok(ListToolsResult { tools, next_cursor: None })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request.arguments.map(JsonValue::Object).unwrap_or(JsonValue::Null);
        let output = self
            .bridge
            .call_tool(&request.name, &args)
            .await
            .map_err(to_mcp_error)?;
        let content = to_content(output.content);
        Ok(if output.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        let prompts = self
            .bridge
            .list_prompts()
            .into_iter()
            .map(to_prompt)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListPromptsResult { prompts, next_cursor: None })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        let args = request.arguments.unwrap_or_default();
        let rendered = self
            .bridge
            .get_prompt(&request.name, &args)
            .map_err(to_mcp_error)?;
        Ok(GetPromptResult {
            description: Some(rendered.description),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, rendered.text)],
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = self
            .bridge
            .list_resources()
            .into_iter()
            .map(|r| {
                let mut raw = RawResource::new(r.uri, r.name);
                raw.description = Some(r.description);
                raw.mime_type = Some(r.mime_type);
                raw.no_annotation()
            })
            .collect();
        Ok(ListResourcesResult { resources, next_cursor: None })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let content = self.bridge.read_resource(&uri).map_err(to_mcp_error)?;
        let contents = serde_json::from_value::<ResourceContents>(content.to_json())
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult { contents: vec![contents] })
    }
}
