//! Protocol Bridge: list/get/read/call over the loaded registry, shaped for
//! the wire but independent of any transport.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use tokio_util::sync::CancellationToken;

use crate::core::content::{normalize_result, ToolOutput};
use crate::core::error::{GatewayError, UnknownCapability};
use crate::core::mcp::ServerIdentity;
use crate::infra::logging::log_metric;
use crate::registry::CapabilityRegistry;
use crate::schema::{to_prompt_arguments, PromptArgumentSpec};
use crate::template;

const URI_SEPARATOR: &str = "://";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptListing {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgumentSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPrompt {
    pub description: String,
    /// Rendered body; sent as a single user-role text message.
    pub text: String,
}

impl RenderedPrompt {
    pub fn to_json(&self) -> JsonValue {
        json!({
            "description": self.description,
            "messages": [{ "role": "user", "content": { "type": "text", "text": self.text } }]
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListing {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ResourceContent {
    /// UTF-8 content as text; `None` for binary files.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn blob(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// One MCP resource-contents entry: `text` when UTF-8, else base64 `blob`.
    pub fn to_json(&self) -> JsonValue {
        match self.text() {
            Some(text) => json!({ "uri": self.uri, "mimeType": self.mime_type, "text": text }),
            None => json!({ "uri": self.uri, "mimeType": self.mime_type, "blob": self.blob() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
}

/// Split `<resourceId>://<filePath>`.
pub fn parse_resource_uri(uri: &str) -> Result<(&str, &str), UnknownCapability> {
    match uri.split_once(URI_SEPARATOR) {
        Some((id, path)) if !id.is_empty() && !path.is_empty() => Ok((id, path)),
        _ => Err(UnknownCapability::MalformedUri(uri.to_owned())),
    }
}

#[derive(Debug)]
pub struct CapabilityBridge {
    registry: RwLock<Arc<CapabilityRegistry>>,
    name_override: Option<String>,
    version_override: Option<String>,
    shutdown: CancellationToken,
}

impl CapabilityBridge {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry: RwLock::new(registry),
            name_override: None,
            version_override: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Name/version announced to clients in place of the document's.
    pub fn with_identity_overrides(mut self, name: Option<String>, version: Option<String>) -> Self {
        self.name_override = name;
        self.version_override = version;
        self
    }

    pub fn identity(&self) -> ServerIdentity {
        let from_doc = self.registry().identity();
        ServerIdentity {
            name: self
                .name_override
                .clone()
                .or_else(|| from_doc.as_ref().map(|d| d.name.clone()))
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned()),
            version: self
                .version_override
                .clone()
                .or_else(|| from_doc.map(|d| d.version))
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_owned()),
        }
    }

    /// Current registry snapshot; in-flight calls keep the one they started with.
    pub fn registry(&self) -> Arc<CapabilityRegistry> {
        match self.registry.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a freshly loaded registry. No merge with the previous one.
    pub fn replace_registry(&self, registry: Arc<CapabilityRegistry>) {
        match self.registry.write() {
            Ok(mut guard) => *guard = registry,
            Err(poisoned) => *poisoned.into_inner() = registry,
        }
        tracing::info!("capability registry replaced");
    }

    /// Cancel every in-flight tool invocation.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn list_prompts(&self) -> Vec<PromptListing> {
        self.registry()
            .prompts()
            .iter()
            .filter(|p| p.enabled())
            .map(|p| PromptListing {
                name: p.id.clone(),
                description: p
                    .description()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("Prompt: {}", p.id)),
                arguments: to_prompt_arguments(&p.parameters),
            })
            .collect()
    }

    /// Render a prompt. Non-string argument values are passed to the
    /// template as their JSON text.
    pub fn get_prompt(&self, id: &str, args: &Map<String, JsonValue>) -> Result<RenderedPrompt, GatewayError> {
        let registry = self.registry();
        let prompt = registry
            .prompt(id)
            .filter(|p| p.enabled())
            .ok_or_else(|| UnknownCapability::Prompt(id.to_owned()))?;
        let values: HashMap<String, String> = args
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let text = match v {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect();
        Ok(RenderedPrompt {
            description: prompt
                .description()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Prompt: {id}")),
            text: template::render(&prompt.body_template, &values),
        })
    }

    /// One entry per served file.
    pub fn list_resources(&self) -> Vec<ResourceListing> {
        let registry = self.registry();
        registry
            .resources()
            .iter()
            .flat_map(|res| {
                res.files.iter().map(move |f| ResourceListing {
                    uri: res.uri_for(f),
                    name: f.name.clone(),
                    description: res.description.clone(),
                    mime_type: f.content_type.to_owned(),
                })
            })
            .collect()
    }

    pub fn read_resource(&self, uri: &str) -> Result<ResourceContent, GatewayError> {
        let (id, path) = parse_resource_uri(uri)?;
        let registry = self.registry();
        let resource = registry
            .resource(id)
            .ok_or_else(|| UnknownCapability::Resource(id.to_owned()))?;
        let file = resource.file(path).ok_or_else(|| UnknownCapability::ResourceFile {
            resource: id.to_owned(),
            path: path.to_owned(),
        })?;
        Ok(ResourceContent {
            uri: uri.to_owned(),
            mime_type: file.content_type.to_owned(),
            bytes: file.content.clone(),
        })
    }

    pub fn list_tools(&self) -> Vec<ToolListing> {
        self.registry()
            .tools()
            .iter()
            .map(|t| ToolListing {
                name: t.id.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Unknown ids and rejected arguments come back as `Err`; failures while
    /// running the tool become an error-flagged [`ToolOutput`].
    pub async fn call_tool(&self, id: &str, args: &JsonValue) -> Result<ToolOutput, GatewayError> {
        let registry = self.registry();
        let tool = registry
            .tool(id)
            .ok_or_else(|| UnknownCapability::Tool(id.to_owned()))?;
        tracing::debug!(tool = %id, external = tool.is_external_process(), "tool call");

        let started = Instant::now();
        let cancel = self.shutdown.child_token();
        let result = tool.invoke(args, &cancel).await;
        log_metric(id, "latency_ms", started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(value) => Ok(ToolOutput::success(normalize_result(value))),
            Err(GatewayError::Execution { message, .. }) => {
                tracing::warn!(tool = %id, error = %message, "tool execution failed");
                log_metric(id, "errors", 1.0);
                Ok(ToolOutput::failure(format!("Tool execution error: {message}")))
            }
            Err(e) => Err(e),
        }
    }
}
