//! Model Context Protocol static resource providers
//!
//! Exposes network snapshots as file-like resources under `resource://` URIs,
//! backed by the same TFL client as the tools.

use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};

use crate::domain::utils::DEFAULT_STATUS_MODES;
use crate::mcp::rpc::{
    app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result,
};
use crate::AppState;

pub const LINE_STATUS_RESOURCE_URI: &str = "resource://lines/status";
pub const DISRUPTIONS_RESOURCE_URI: &str = "resource://network/disruptions";

pub fn build_resources_list() -> Vec<Resource> {
    vec![
        Resource {
            annotations: None,
            description: Some("Current status of the main TFL rail lines".to_string()),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "Line Status Snapshot".to_string(),
            size: None,
            title: None,
            uri: LINE_STATUS_RESOURCE_URI.to_string(),
        },
        Resource {
            annotations: None,
            description: Some("Active disruptions across the TFL network".to_string()),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "Network Disruptions Snapshot".to_string(),
            size: None,
            title: None,
            uri: DISRUPTIONS_RESOURCE_URI.to_string(),
        },
    ]
}

fn resource_contents(uri: &str, structured_content: Value) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ReadResourceContent::from(TextResourceContents {
            meta: None,
            mime_type: Some("application/json".to_string()),
            text: structured_content.to_string(),
            uri: uri.to_string(),
        })],
        meta: None,
    }
}

pub async fn handle_resources_read(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    match resource_read.uri.as_str() {
        LINE_STATUS_RESOURCE_URI => {
            match state.transit.line_status(DEFAULT_STATUS_MODES).await {
                Ok(lines) => {
                    let result = serde_json::to_value(resource_contents(
                        LINE_STATUS_RESOURCE_URI,
                        json!({ "lines": lines }),
                    ))
                    .expect("read line status result serialization");
                    json_rpc_result(id, result)
                }
                Err(err) => app_error_to_json_rpc(id, err),
            }
        }
        DISRUPTIONS_RESOURCE_URI => {
            match state.transit.disruptions(DEFAULT_STATUS_MODES).await {
                Ok(disruptions) => {
                    let result = serde_json::to_value(resource_contents(
                        DISRUPTIONS_RESOURCE_URI,
                        json!({ "disruptions": disruptions }),
                    ))
                    .expect("read disruptions result serialization");
                    json_rpc_result(id, result)
                }
                Err(err) => app_error_to_json_rpc(id, err),
            }
        }
        _ => json_rpc_error_with_data(
            id,
            -32601,
            "Method not found",
            Some(json!({
                "code": "resource_not_found",
                "message": "unknown resource uri",
                "details": {
                    "uri": resource_read.uri,
                },
            })),
        ),
    }
}
