use axum::Json;

use crate::core::error::GatewayError;
use crate::core::mcp::{
    err as rpc_err, ok as rpc_ok, RpcErr, RpcResp, APPLICATION_ERROR, INVALID_PARAMS, PARSE_ERROR,
};

pub fn ok(id: serde_json::Value, result: serde_json::Value) -> Json<RpcResp> {
    Json(rpc_ok(id, result))
}

pub fn error(id: serde_json::Value, code: i32, message: impl Into<String>) -> Json<RpcResp> {
    Json(rpc_err(id, code, message, None))
}

pub fn parse_error(message: impl Into<String>) -> Json<RpcResp> {
    Json(RpcResp {
        jsonrpc: "2.0",
        id: serde_json::Value::Null,
        result: None,
        error: Some(RpcErr {
            code: PARSE_ERROR,
            message: message.into(),
            data: None,
        }),
    })
}

/// Unresolved ids and rejected arguments are the caller's fault (-32602);
/// everything else is an application error (-32000).
pub fn from_gateway_error(id: serde_json::Value, err: GatewayError) -> Json<RpcResp> {
    let code = match err {
        GatewayError::UnknownCapability(_) | GatewayError::InvalidArguments { .. } => INVALID_PARAMS,
        _ => APPLICATION_ERROR,
    };
    error(id, code, err.to_string())
}
