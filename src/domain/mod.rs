//! Capability records built once per registry load and immutable afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use tokio_util::sync::CancellationToken;

use crate::core::error::GatewayError;
use crate::core::tool::ToolHandler;
use crate::schema::{self, CanonicalParameter};
use crate::tools::script::ScriptTool;

#[derive(Debug, Clone, PartialEq)]
pub struct PromptCapability {
    /// Slash-joined relative path with the extension stripped, or the
    /// manifest-declared id.
    pub id: String,
    pub source_path: PathBuf,
    pub body_template: String,
    pub parameters: Vec<CanonicalParameter>,
    /// Free-form keys (description, author, tags, category, enabled, ...).
    pub metadata: Map<String, JsonValue>,
}

impl PromptCapability {
    pub fn description(&self) -> Option<&str> {
        self.metadata.get("description").and_then(JsonValue::as_str)
    }

    /// Manifest entries may switch a prompt off; files are always enabled.
    pub fn enabled(&self) -> bool {
        self.metadata
            .get("enabled")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFile {
    pub name: String,
    /// `/`-separated, relative to the resource directory.
    pub relative_path: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

impl ResourceFile {
    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/")
            || matches!(
                self.content_type,
                "application/json"
                    | "application/javascript"
                    | "application/typescript"
                    | "application/yaml"
                    | "image/svg+xml"
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCapability {
    /// Directory name.
    pub id: String,
    pub description: String,
    pub files: Vec<ResourceFile>,
}

impl ResourceCapability {
    pub fn file(&self, relative_path: &str) -> Option<&ResourceFile> {
        self.files.iter().find(|f| f.relative_path == relative_path)
    }

    pub fn uri_for(&self, file: &ResourceFile) -> String {
        format!("{}://{}", self.id, file.relative_path)
    }
}

/// How a tool runs: a compiled-in handler or an external executable.
#[derive(Clone)]
pub enum ToolInvoker {
    InProcess(Arc<dyn ToolHandler>),
    Script(ScriptTool),
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolInvoker::InProcess(_) => f.write_str("InProcess"),
            ToolInvoker::Script(s) => f.debug_tuple("Script").field(&s.path()).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolCapability {
    pub id: String,
    pub source_path: PathBuf,
    pub description: String,
    pub parameters: Vec<CanonicalParameter>,
    pub invoker: ToolInvoker,
}

impl ToolCapability {
    pub fn input_schema(&self) -> JsonValue {
        schema::to_json_schema(&self.parameters)
    }

    pub fn is_external_process(&self) -> bool {
        matches!(self.invoker, ToolInvoker::Script(_))
    }

    pub fn process_path(&self) -> Option<&Path> {
        match &self.invoker {
            ToolInvoker::Script(s) => Some(s.path()),
            ToolInvoker::InProcess(_) => None,
        }
    }

    /// Validate `args` against the declared parameters, then run the tool.
    /// Undeclared arguments pass through to the handler untouched.
    pub async fn invoke(
        &self,
        args: &JsonValue,
        cancel: &CancellationToken,
    ) -> Result<JsonValue, GatewayError> {
        schema::validate(&self.parameters, args).map_err(|problems| GatewayError::InvalidArguments {
            id: self.id.clone(),
            problems,
        })?;
        match &self.invoker {
            ToolInvoker::InProcess(handler) => tokio::select! {
                res = handler.call(args) => res.map_err(|m| GatewayError::execution(&self.id, m)),
                _ = cancel.cancelled() => Err(GatewayError::execution(&self.id, "cancelled")),
            },
            ToolInvoker::Script(script) => script.execute(args, cancel).await,
        }
    }
}
