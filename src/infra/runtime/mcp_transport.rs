//! Generic MCP transport helpers (stdio + streamable HTTP) decoupled from capability logic.

use std::sync::Arc;

use anyhow::anyhow;
use rmcp::serve_server;
use rmcp::transport::streamable_http_server::tower::{StreamableHttpServerConfig, StreamableHttpService};

pub use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
pub use rmcp::ServerHandler;

/// Serve one handler over process stdin/stdout until the client disconnects.
pub async fn serve_stdio<H>(handler: H) -> anyhow::Result<()>
where
    H: ServerHandler,
{
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let running = serve_server(handler, (stdin, stdout))
        .await
        .map_err(|e| anyhow!("stdio initialize failed: {e}"))?;
    let reason = running.waiting().await?;
    tracing::info!(?reason, "stdio session ended");
    Ok(())
}

pub fn make_streamable_http_service<H>(
    factory: impl Fn() -> H + Send + Sync + 'static,
    session_mgr: Arc<LocalSessionManager>,
) -> StreamableHttpService<H, LocalSessionManager>
where
    H: ServerHandler,
{
    let cfg = StreamableHttpServerConfig::default();
    StreamableHttpService::new(move || Ok(factory()), session_mgr, cfg)
}
