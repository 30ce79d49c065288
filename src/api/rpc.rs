//! Plain JSON-RPC endpoint (`POST /v1/rpc`) over the Protocol Bridge.
//!
//! Kept for clients that do not speak the streamable MCP transport. Every
//! request is independent; nothing is stored between calls.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value as J};

use crate::bridge::CapabilityBridge;
use crate::core::mcp::{RpcReq, RpcResp, APPLICATION_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::infra::http::json as http_json;

type Outcome = Result<J, axum::Json<RpcResp>>;

fn str_param<'a>(id: &J, params: &'a J, key: &str) -> Result<&'a str, axum::Json<RpcResp>> {
    params
        .get(key)
        .and_then(J::as_str)
        .ok_or_else(|| http_json::error(id.clone(), INVALID_PARAMS, format!("missing '{key}'")))
}

fn arguments(params: &J) -> Map<String, J> {
    match params.get("arguments") {
        Some(J::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn initialize(bridge: &CapabilityBridge) -> J {
    let id = bridge.identity();
    json!({
        "serverInfo": { "name": id.name, "version": id.version },
        "capabilities": { "prompts": {}, "resources": {}, "tools": {} }
    })
}

fn get_prompt(bridge: &CapabilityBridge, id: &J, params: &J) -> Outcome {
    let name = str_param(id, params, "name")?;
    bridge
        .get_prompt(name, &arguments(params))
        .map(|rendered| rendered.to_json())
        .map_err(|e| http_json::from_gateway_error(id.clone(), e))
}

fn read_resource(bridge: &CapabilityBridge, id: &J, params: &J) -> Outcome {
    let uri = str_param(id, params, "uri")?;
    bridge
        .read_resource(uri)
        .map(|content| json!({ "contents": [content.to_json()] }))
        .map_err(|e| http_json::from_gateway_error(id.clone(), e))
}

async fn call_tool(bridge: &CapabilityBridge, id: &J, params: &J) -> Outcome {
    let name = str_param(id, params, "name")?;
    let args = params.get("arguments").cloned().unwrap_or(J::Null);
    let output = bridge
        .call_tool(name, &args)
        .await
        .map_err(|e| http_json::from_gateway_error(id.clone(), e))?;
    if output.is_error {
        let message = output
            .content
            .first()
            .and_then(|item| item.get("text"))
            .and_then(J::as_str)
            .unwrap_or("tool execution failed")
            .to_owned();
        return Err(http_json::error(id.clone(), APPLICATION_ERROR, message));
    }
    Ok(json!({ "content": output.content, "isError": false }))
}

async fn dispatch(bridge: &CapabilityBridge, req: RpcReq) -> RpcResp {
    let id = req.id.clone();
    let outcome: Outcome = match req.method.as_str() {
        "initialize" => Ok(initialize(bridge)),
        "prompts/list" => Ok(json!({ "prompts": bridge.list_prompts() })),
        "prompts/get" => get_prompt(bridge, &id, &req.params),
        "resources/list" => Ok(json!({ "resources": bridge.list_resources() })),
        "resources/read" => read_resource(bridge, &id, &req.params),
        "tools/list" => Ok(json!({ "tools": bridge.list_tools() })),
        "tools/call" => call_tool(bridge, &id, &req.params).await,
        other => Err(http_json::error(id.clone(), METHOD_NOT_FOUND, format!("unknown method: {other}"))),
    };
    match outcome {
        Ok(result) => http_json::ok(id, result).0,
        Err(resp) => resp.0,
    }
}

pub async fn http(State(bridge): State<Arc<CapabilityBridge>>, body: Bytes) -> Response {
    let req: RpcReq = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting malformed rpc body");
            return (StatusCode::BAD_REQUEST, http_json::parse_error(format!("parse error: {e}")))
                .into_response();
        }
    };
    tracing::debug!(method = %req.method, id = ?req.id, "rpc request");
    let resp = dispatch(&bridge, req).await;
    if let Some(err) = &resp.error {
        tracing::warn!(code = err.code, message = %err.message, "rpc error response");
    }
    axum::Json(resp).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CapabilityRegistry;
    use crate::infra::runtime::limits::ExecLimits;
    use crate::tools::registry::PluginCatalog;
    use axum::body::{to_bytes, Body};
    use axum::{routing::post, Router};
    use hyper::Request;
    use std::path::Path;
    use tower::ServiceExt;

    const BODY_LIMIT: usize = 1024 * 1024;

    fn write(root: &Path, rel: &str, text: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, text).unwrap();
    }

    async fn router() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "mcp-config.yaml", "name: rpc\nversion: '2'\npaths:\n  prompts: prompts\n  tools: tools\n");
        write(
            root,
            "prompts/hi.md",
            "---\nparameters:\n  who: { type: string, enum: [there, you] }\n---\nHi {{who}}",
        );
        write(root, "tools/echo.yml", "name: echo\nhandler: echo\nparameters:\n  message: { type: string }\n");
        let registry = CapabilityRegistry::load(root, PluginCatalog::with_builtins(), ExecLimits::default())
            .await
            .unwrap();
        let bridge = Arc::new(CapabilityBridge::new(Arc::new(registry)));
        (dir, Router::new().route("/v1/rpc", post(http)).with_state(bridge))
    }

    async fn post_raw(app: &Router, body: &str) -> (StatusCode, J) {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/rpc")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn call(app: &Router, method: &str, params: J) -> J {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        post_raw(app, &body.to_string()).await.1
    }

    #[tokio::test]
    async fn initialize_reports_document_identity() {
        let (_dir, app) = router().await;
        let v = call(&app, "initialize", J::Null).await;
        assert_eq!(v["result"]["serverInfo"]["name"], "rpc");
        assert_eq!(v["result"]["serverInfo"]["version"], "2");
    }

    #[tokio::test]
    async fn prompts_list_and_get() {
        let (_dir, app) = router().await;
        let v = call(&app, "prompts/list", J::Null).await;
        assert_eq!(v["result"]["prompts"][0]["name"], "hi");
        let who = &v["result"]["prompts"][0]["arguments"][0];
        assert_eq!(who["type"], "string");
        assert_eq!(who["enum"], json!(["there", "you"]));

        let v = call(&app, "prompts/get", json!({ "name": "hi", "arguments": { "who": "there" } })).await;
        assert_eq!(v["result"]["messages"][0]["content"]["text"], "Hi there");

        let v = call(&app, "prompts/get", json!({ "name": "nope" })).await;
        assert_eq!(v["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn tools_call_and_errors() {
        let (_dir, app) = router().await;
        let v = call(&app, "tools/list", J::Null).await;
        assert_eq!(v["result"]["tools"][0]["inputSchema"]["type"], "object");

        let v = call(&app, "tools/call", json!({ "name": "echo", "arguments": { "message": "yo" } })).await;
        assert_eq!(v["result"]["content"][0]["text"], "yo");
        assert_eq!(v["result"]["isError"], false);

        let v = call(&app, "tools/call", json!({ "name": "echo", "arguments": {} })).await;
        assert_eq!(v["error"]["code"], -32602);

        let v = call(&app, "tools/call", json!({ "arguments": {} })).await;
        assert!(v["error"]["message"].as_str().unwrap().contains("missing 'name'"));
    }

    #[tokio::test]
    async fn resources_read_of_unknown_uri_is_invalid_params() {
        let (_dir, app) = router().await;
        let v = call(&app, "resources/list", J::Null).await;
        assert_eq!(v["result"]["resources"], json!([]));
        let v = call(&app, "resources/read", json!({ "uri": "ghost://x" })).await;
        assert_eq!(v["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn unknown_method_and_malformed_body() {
        let (_dir, app) = router().await;
        let v = call(&app, "tools/frobnicate", J::Null).await;
        assert_eq!(v["error"]["code"], -32601);

        let (status, v) = post_raw(&app, "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"]["code"], -32700);
    }
}
