//! MCP server over stateless HTTP
//!
//! Each POST carries one JSON-RPC message. Requests get a JSON-RPC response;
//! notifications are acknowledged with `202 Accepted` and no body.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;
use crate::server::AppState;

const SERVER_NAME: &str = "google-workspace";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Google Workspace
pub struct McpServer {
    tool_handler: ToolHandler,
}

impl McpServer {
    pub fn new(tool_handler: ToolHandler) -> Self {
        Self { tool_handler }
    }

    /// Handle one JSON-RPC message; `None` for notifications
    pub async fn handle_message(&self, message: &[u8]) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_slice(message) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string())));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::invalid_request(e.to_string()),
                ));
            }
        };

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification");
            return None;
        }

        tracing::debug!(method = %request.method, "request");
        let response = match request.method.as_str() {
            methods::INITIALIZE => result_value(&self.initialize_result()),
            methods::PING => Ok(json!({})),
            methods::LIST_TOOLS => result_value(&ListToolsResult {
                tools: self.tool_handler.list_tools(),
            }),
            methods::CALL_TOOL => self.call_tool(request.params).await,
            // `notifications/initialized` sent with an id still needs an answer
            methods::INITIALIZED => Ok(json!({})),
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match response {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tool parameters"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| {
                    JsonRpcError::invalid_params(format!("Invalid tool parameters: {}", e))
                })
            })?;

        let result = self.tool_handler.call_tool(&params.name, params.arguments).await;
        result_value(&result)
    }
}

fn result_value<T: Serialize>(result: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(result)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize result: {}", e)))
}

/// `POST /api/mcp`
pub async fn mcp_post(State(state): State<AppState>, body: Bytes) -> Response {
    match state.mcp.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Any other method on `/api/mcp`
pub async fn mcp_method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(JsonRpcResponse::error(
            None,
            JsonRpcError::invalid_request("Method not allowed; POST JSON-RPC messages"),
        )),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::clock::SystemClock;
    use crate::config::Config;
    use crate::google::{MemoryTokenStore, WorkspaceBroker};

    fn server() -> McpServer {
        let broker = WorkspaceBroker::new(
            Arc::new(Config::default()),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(SystemClock),
        )
        .unwrap();
        McpServer::new(ToolHandler::new(Arc::new(broker), "Europe/Berlin"))
    }

    async fn call(message: Value) -> Option<Value> {
        let bytes = serde_json::to_vec(&message).unwrap();
        server()
            .handle_message(&bytes)
            .await
            .map(|r| serde_json::to_value(r).unwrap())
    }

    #[test]
    fn test_unserializable_result_is_internal_error() {
        let mut by_pair = std::collections::HashMap::new();
        by_pair.insert((1, 2), "not a string key");

        let error = result_value(&by_pair).unwrap_err();
        assert_eq!(error.code, -32603);
        assert!(error.message.starts_with("Failed to serialize result"));
        assert!(result_value(&json!({"ok": true})).is_ok());
    }

    #[tokio::test]
    async fn test_initialize() {
        let message = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});
        let response = call(message)
            .await
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], MCP_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let response = call(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_ping_and_unknown_method() {
        let pong = call(json!({"jsonrpc": "2.0", "id": "a", "method": "ping"})).await.unwrap();
        assert_eq!(pong["id"], "a");
        assert_eq!(pong["result"], json!({}));

        let unknown = call(json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}))
            .await
            .unwrap();
        assert_eq!(unknown["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let response = server().handle_message(b"{not json").await.unwrap();
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["error"]["code"], -32700);
        assert!(json["id"].is_null());
    }

    #[tokio::test]
    async fn test_tools_call_failure_is_tool_error() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "gmail_list_labels", "arguments": {"userEmail": "ada@example.com"}}
        }))
        .await
        .unwrap();
        assert_eq!(response["result"]["isError"], true);
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn test_tools_call_without_params() {
        let response = call(json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call"}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32602);
    }
}
