use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::bridge::CapabilityBridge;
use crate::infra::config::Config;
use crate::registry::CapabilityRegistry;
use crate::tools::registry::PluginCatalog;

/// Load the capability directory named by `cfg` and wrap it in a bridge.
pub async fn load_bridge(cfg: &Config) -> anyhow::Result<Arc<CapabilityBridge>> {
    let registry = CapabilityRegistry::load(
        &cfg.config_dir,
        PluginCatalog::with_builtins(),
        cfg.exec_limits(),
    )
    .await
    .with_context(|| format!("loading capabilities from {}", cfg.config_dir.display()))?;
    for warning in registry.warnings() {
        tracing::warn!(%warning, "capability skipped");
    }
    let bridge = CapabilityBridge::new(Arc::new(registry))
        .with_identity_overrides(cfg.server_name.clone(), cfg.server_version.clone());
    Ok(Arc::new(bridge))
}

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    tracing::info!(
        mode = %cfg.mode,
        port = cfg.port,
        deprecate_rest = cfg.deprecate_rest,
        config_dir = %cfg.config_dir.display(),
        "BOOT capability-gateway"
    );
    let bridge = load_bridge(&cfg).await?;

    // Stdio mode: run MCP over stdio ONLY (no HTTP).
    if cfg.is_stdio() {
        let handler = crate::infra::mcp::GatewaySvc::new(bridge.clone());
        tokio::select! {
            res = crate::infra::runtime::mcp_transport::serve_stdio(handler) => res?,
            _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received"),
        }
        bridge.shutdown();
        return Ok(());
    }

    let app = crate::infra::http_app::build_app(bridge.clone(), cfg.deprecate_rest);
    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("interrupt received, draining");
            bridge.shutdown();
        })
        .await?;
    Ok(())
}
