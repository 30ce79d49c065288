use std::collections::HashMap;
use std::sync::Arc;

use crate::core::tool::ToolHandler;
use super::builtin::EchoTool;

/// Compiled-in tool handlers that module descriptors bind to by key.
#[derive(Clone, Default)]
pub struct PluginCatalog(HashMap<String, Arc<dyn ToolHandler>>);

impl PluginCatalog {
    pub fn with_builtins() -> Self {
        let mut catalog = Self::default();
        catalog.register("echo", Arc::new(EchoTool));
        catalog
    }

    /// Returns the handler previously registered under `key`, if any.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Option<Arc<dyn ToolHandler>> {
        self.0.insert(key.into(), handler)
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ToolHandler>> {
        self.0.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PluginCatalog").field(&self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_include_echo() {
        let catalog = PluginCatalog::with_builtins();
        assert!(catalog.get("echo").is_some());
        assert!(catalog.get("hello.echo").is_none());
        assert_eq!(catalog.keys(), vec!["echo"]);
    }

    #[test]
    fn register_replaces_and_returns_previous() {
        let mut catalog = PluginCatalog::with_builtins();
        let previous = catalog.register("echo", Arc::new(EchoTool));
        assert!(previous.is_some());
        assert!(catalog.register("shout", Arc::new(EchoTool)).is_none());
        assert_eq!(catalog.keys(), vec!["echo", "shout"]);
    }
}
