use std::path::Path;
use std::sync::Arc;

use axum::Router;
use http_body_util::BodyExt; // for .collect
use hyper::{header, Request, StatusCode};
use serde_json::{json, Value};
use tokio::time::{timeout, Duration};
use tower::ServiceExt; // for .oneshot

use capability_gateway::bridge::CapabilityBridge;
use capability_gateway::infra::http_app::build_app;
use capability_gateway::infra::runtime::limits::ExecLimits;
use capability_gateway::registry::CapabilityRegistry;
use capability_gateway::tools::registry::PluginCatalog;

static MCP_PROTOCOL_VERSION: &str = "2025-03-26";

fn write(root: &Path, rel: &str, text: &str) {
    let p = root.join(rel);
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(p, text).unwrap();
}

async fn app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "mcp-config.yaml",
        "name: http-fixture\nversion: 0.9.0\npaths:\n  prompts: prompts\n  resources: resources\n  tools: tools\n",
    );
    write(root, "prompts/review.md", "---\ndescription: Review code\nparameters:\n  language: { type: string }\n---\nReview this {{language}} code.");
    write(root, "resources/docs/README.md", "# Docs\n");
    write(root, "resources/docs/guide.md", "# Guide\n");
    write(
        root,
        "tools/echo.yaml",
        "name: echo\ndescription: Echo a message\nhandler: echo\nparameters:\n  message: { type: string }\n",
    );
    let registry = CapabilityRegistry::load(root, PluginCatalog::with_builtins(), ExecLimits::default())
        .await
        .unwrap();
    let bridge = Arc::new(CapabilityBridge::new(Arc::new(registry)));
    (dir, build_app(bridge, true))
}

fn post(session: Option<&str>, body: Value) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::ACCEPT, "application/json, text/event-stream")
        .header(header::CONTENT_TYPE, "application/json")
        .header("MCP-Protocol-Version", MCP_PROTOCOL_VERSION);
    if let Some(id) = session {
        builder = builder.header("MCP-Session-Id", id);
    }
    builder.body(axum::body::Body::from(body.to_string())).unwrap()
}

async fn initialize(app: &Router) -> String {
    let init = json!({
        "jsonrpc":"2.0","id":1,"method":"initialize",
        "params":{ "protocolVersion": MCP_PROTOCOL_VERSION, "capabilities":{}, "clientInfo":{"name":"test","version":"0.1"} }
    });
    let init_res = app.clone().oneshot(post(None, init)).await.unwrap();
    assert!(init_res.status().is_success());
    let session_id = init_res
        .headers()
        .get("MCP-Session-Id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();

    let initialized = json!({"jsonrpc":"2.0","method":"notifications/initialized","params":{}});
    let res = app.clone().oneshot(post(Some(&session_id), initialized)).await.unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    session_id
}

/// Send one request in the session and pull its JSON-RPC response out of the SSE body.
async fn rpc(app: &Router, session: &str, id: u64, method: &str, params: Value) -> Value {
    let body = json!({ "jsonrpc":"2.0", "id": id, "method": method, "params": params });
    let res = timeout(Duration::from_secs(20), app.clone().oneshot(post(Some(session), body)))
        .await
        .unwrap()
        .unwrap();
    assert!(res.status().is_success());
    let bytes = timeout(Duration::from_secs(20), res.into_body().collect())
        .await
        .unwrap()
        .unwrap()
        .to_bytes();
    let s = String::from_utf8_lossy(&bytes);
    s.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|d| serde_json::from_str::<Value>(d).ok())
        .find(|v| v["id"] == json!(id))
        .unwrap_or_else(|| panic!("no response for {method} in {s}"))
}

#[tokio::test]
async fn initialize_announces_identity_and_capabilities() {
    let (_dir, app) = app().await;
    let init = json!({
        "jsonrpc":"2.0","id":1,"method":"initialize",
        "params":{ "protocolVersion": MCP_PROTOCOL_VERSION, "capabilities":{}, "clientInfo":{"name":"test","version":"0.1"} }
    });
    let res = app.clone().oneshot(post(None, init)).await.unwrap();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let s = String::from_utf8_lossy(&bytes);
    let v: Value = s
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .and_then(|d| serde_json::from_str(d).ok())
        .expect("initialize response");
    assert_eq!(v["result"]["serverInfo"]["name"], "http-fixture");
    assert_eq!(v["result"]["serverInfo"]["version"], "0.9.0");
    assert!(v["result"]["capabilities"]["prompts"].is_object());
    assert!(v["result"]["capabilities"]["resources"].is_object());
    assert!(v["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn prompts_and_resources_over_streamable_http() {
    let (_dir, app) = app().await;
    let session = initialize(&app).await;

    let v = rpc(&app, &session, 2, "prompts/list", json!({})).await;
    assert_eq!(v["result"]["prompts"][0]["name"], "review");
    assert_eq!(v["result"]["prompts"][0]["arguments"][0]["name"], "language");
    assert_eq!(v["result"]["prompts"][0]["arguments"][0]["required"], true);
    let hint = v["result"]["prompts"][0]["arguments"][0]["description"].as_str().unwrap();
    assert!(hint.contains("string"), "type hint missing from {hint}");

    let v = rpc(&app, &session, 3, "prompts/get", json!({ "name": "review", "arguments": { "language": "Rust" } })).await;
    assert_eq!(v["result"]["messages"][0]["role"], "user");
    assert_eq!(v["result"]["messages"][0]["content"]["text"], "Review this Rust code.");

    let v = rpc(&app, &session, 4, "resources/list", json!({})).await;
    assert_eq!(v["result"]["resources"][0]["uri"], "docs://guide.md");
    assert_eq!(v["result"]["resources"][0]["mimeType"], "text/markdown");

    let v = rpc(&app, &session, 5, "resources/read", json!({ "uri": "docs://guide.md" })).await;
    assert_eq!(v["result"]["contents"][0]["text"], "# Guide\n");

    let v = rpc(&app, &session, 6, "resources/read", json!({ "uri": "docs://missing.txt" })).await;
    assert_eq!(v["error"]["code"], -32002);
}

#[tokio::test]
async fn tools_list_and_call_over_streamable_http() {
    let (_dir, app) = app().await;
    let session = initialize(&app).await;

    let v = rpc(&app, &session, 2, "tools/list", json!({})).await;
    let tool = &v["result"]["tools"][0];
    assert_eq!(tool["name"], "echo");
    assert_eq!(tool["inputSchema"]["required"], json!(["message"]));

    let v = rpc(&app, &session, 3, "tools/call", json!({ "name": "echo", "arguments": { "message": "Dia duit" } })).await;
    assert_eq!(v["result"]["content"][0]["text"], "Dia duit");
    assert_ne!(v["result"]["isError"], true);

    let v = rpc(&app, &session, 4, "tools/call", json!({ "name": "ghost", "arguments": {} })).await;
    assert_eq!(v["error"]["code"], -32602);
}
