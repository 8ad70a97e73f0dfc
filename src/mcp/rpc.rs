//! JSON-RPC protocol representations and formatting utilities
//!
//! Maps internal `AppError`s to valid JSON-RPC payloads and provides the
//! response constructors the rest of the server builds on.

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde_json::{json, Value};

use crate::errors::AppError;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn app_error_to_json_rpc(id: Option<Value>, err: AppError) -> Value {
    match err {
        AppError::BadRequest { code, message } => json_rpc_error_with_data(
            id,
            -32602,
            "Invalid params",
            Some(json!({
                "code": code,
                "message": message,
                "details": {}
            })),
        ),
        AppError::Unauthorized { code, message } => json_rpc_error_with_data(
            id,
            -32001,
            "Unauthorized",
            Some(json!({
                "code": code,
                "message": message,
                "details": {}
            })),
        ),
        AppError::Upstream { message } => json_rpc_error_with_data(
            id,
            -32603,
            "Internal error",
            Some(json!({
                "code": "upstream_error",
                "message": message,
                "details": {}
            })),
        ),
        AppError::Internal { .. } => json_rpc_error(id, -32603, "Internal error"),
    }
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        return serde_json::to_value(response).expect("jsonrpc result response serialization");
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_carry_the_descriptive_message_as_data() {
        let response = app_error_to_json_rpc(
            Some(json!(1)),
            AppError::upstream("Connection error: timed out"),
        );
        assert_eq!(response["error"]["code"], json!(-32603));
        assert_eq!(response["error"]["data"]["code"], json!("upstream_error"));
        assert_eq!(
            response["error"]["data"]["message"],
            json!("Connection error: timed out")
        );
    }

    #[test]
    fn internal_errors_never_leak_details() {
        let response = app_error_to_json_rpc(Some(json!(1)), AppError::internal("secret detail"));
        assert_eq!(response["error"]["message"], json!("Internal error"));
        assert!(response["error"].get("data").is_none());
    }
}
