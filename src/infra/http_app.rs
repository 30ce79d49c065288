use axum::{
    routing::{any_service, get, post},
    Router,
};
use std::sync::Arc;

use crate::bridge::CapabilityBridge;
use crate::infra::mcp;
use crate::infra::runtime::mcp_transport::{make_streamable_http_service, LocalSessionManager};

/// `/healthz` + streamable MCP at `/mcp`, plus the plain JSON-RPC endpoint at
/// `/v1/rpc` unless `deprecate_rest` is set.
pub fn build_app(bridge: Arc<CapabilityBridge>, deprecate_rest: bool) -> Router {
    let session_mgr = Arc::new(LocalSessionManager::default());
    let mcp_service = make_streamable_http_service(mcp::make_factory(bridge.clone()), session_mgr);

    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route_service("/mcp", any_service(mcp_service));

    if deprecate_rest {
        return app;
    }
    app.route("/v1/rpc", post(crate::api::rpc::http).with_state(bridge))
}
