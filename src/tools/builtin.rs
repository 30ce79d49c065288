use async_trait::async_trait;
use serde_json::json;

use crate::core::tool::ToolHandler;

/// Echoes `message` back, or greets `name` when no message is given.
#[derive(Clone, Default)]
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, String> {
        if let Some(message) = arguments.get("message").and_then(|v| v.as_str()) {
            return Ok(json!(message));
        }
        let name = arguments.get("name").and_then(|v| v.as_str()).unwrap_or("world");
        Ok(json!({ "message": format!("Hello, {name}!") }))
    }
}
