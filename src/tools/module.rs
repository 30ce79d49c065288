//! Declarative in-process tool modules.
//!
//! A descriptor file names a compiled-in handler and describes its input:
//!
//! ```yaml
//! name: echo
//! description: Echo a message back
//! handler: echo
//! inputSchema:
//!   type: object
//!   properties:
//!     message: { type: string }
//!   required: [message]
//! ```
//!
//! `parameters` (inline map) may stand in for `inputSchema`; when both are
//! present `inputSchema` wins.

use std::path::Path;

use serde_json::Value as JsonValue;

use crate::schema::{normalize, CanonicalParameter, SchemaSource};

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<CanonicalParameter>,
    pub handler: String,
}

/// Parse and shape-check one descriptor. The error string is the reason the
/// file was rejected.
pub fn parse_descriptor(path: &Path, text: &str) -> Result<ModuleDescriptor, String> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let doc: JsonValue = if is_json {
        serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?
    } else {
        serde_yaml::from_str(text).map_err(|e| format!("invalid YAML: {e}"))?
    };
    let obj = doc
        .as_object()
        .ok_or_else(|| "descriptor must be a mapping".to_owned())?;

    let name = match obj.get("name") {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
        Some(_) => return Err("'name' must be a non-empty string".into()),
        None => return Err("missing 'name'".into()),
    };
    let handler = match obj.get("handler") {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
        Some(_) => return Err("'handler' must name a registered plugin".into()),
        None => return Err("missing 'handler'".into()),
    };
    let description = match obj.get("description") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(_) => return Err("'description' must be a string".into()),
    };
    let parameters = match (obj.get("inputSchema"), obj.get("parameters")) {
        (Some(schema), _) => normalize(SchemaSource::JsonSchema(schema)),
        (None, Some(params)) => normalize(SchemaSource::InlineMap(params)),
        (None, None) => return Err("one of 'inputSchema' or 'parameters' is required".into()),
    };

    Ok(ModuleDescriptor { name, description, parameters, handler })
}
