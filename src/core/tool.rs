use async_trait::async_trait;

/// In-process tool implementation bound to a module descriptor by key.
///
/// Handlers receive the already-validated argument object and return any
/// JSON value; the bridge normalizes it into protocol content.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, args: &serde_json::Value) -> Result<serde_json::Value, String> {
            Ok(args.clone())
        }
    }

    #[tokio::test]
    async fn it_runs_echo() {
        let t = Echo;
        let out = t.call(&serde_json::json!({"x":1})).await.unwrap();
        assert_eq!(out["x"], 1);
    }
}
