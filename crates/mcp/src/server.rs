// MCP dispatcher: routes JSON-RPC methods to the tool catalog and decoder

use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo, ToolsCapability,
    MCP_PROTOCOL_VERSION,
};
use crate::schema::SchemaError;
use crate::tools::{catalog, ArgumentValidators, CqTool, ToolCall};
use cqgate_core::CqDecoder;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const SERVER_NAME: &str = "cq-mcp-server";

/// Stateless JSON-RPC dispatcher; every call is handled on its own
pub struct McpServer {
    decoder: Arc<CqDecoder>,
    validators: ArgumentValidators,
}

impl McpServer {
    /// Compiles the argument schemas of every catalog tool
    pub fn new(decoder: Arc<CqDecoder>) -> Result<Self, SchemaError> {
        Ok(Self {
            decoder,
            validators: ArgumentValidators::compile()?,
        })
    }

    /// Handle one validated request; always yields a response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.response_id();

        tracing::debug!(method = %request.method, id = %id, "Handling MCP request");

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "tools/list" => to_result(&ListToolsResult {
                tools: catalog().to_vec(),
            }),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                tracing::debug!(method = %request.method, code = error.code, message = %error.message, "MCP request failed");
                JsonRpcResponse::error(id, error)
            }
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        // Client details are informational only
        if let Some(params) = params
            .and_then(|p| serde_json::from_value::<InitializeParams>(p).ok())
        {
            tracing::info!(
                client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
                protocol_version = params.protocol_version.as_deref().unwrap_or("unspecified"),
                "MCP client initializing"
            );
        }

        to_result(&InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability::default(),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Invalid params: params required"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| {
                    JsonRpcError::invalid_params("Invalid params").with_data(e.to_string())
                })
            })?;

        let Some(arguments) = params.arguments else {
            return Err(JsonRpcError::invalid_params(
                "Invalid params: arguments required",
            ));
        };

        let tool = CqTool::from_name(&params.name)
            .ok_or_else(|| JsonRpcError::tool_not_found(&params.name))?;

        let call = ToolCall::decode(tool, arguments, &self.validators)?;

        match call.execute(&self.decoder).await {
            Ok(result) => to_result(&result),
            Err(e) => {
                tracing::warn!(tool = tool.name(), error = %e, "Tool execution failed");
                Err(JsonRpcError::internal_error("Tool execution failed").with_data(e.to_string()))
            }
        }
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::internal_error("Internal error").with_data(e.to_string()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::protocol::{code, parse_envelope};
    use cqgate_core::testing::fake_decoder;
    use serde_json::json;

    fn server() -> McpServer {
        McpServer::new(Arc::new(fake_decoder())).unwrap()
    }

    async fn call(server: &McpServer, body: Value) -> JsonRpcResponse {
        let request = parse_envelope(body.to_string().as_bytes()).unwrap();
        server.handle_request(request).await
    }

    #[tokio::test]
    async fn test_initialize_describes_server() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
                "protocolVersion": "2024-11-05",
                "clientInfo": {"name": "inspector", "version": "1.0"}
            }}),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["capabilities"]["tools"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_list_is_stable() {
        let server = server();
        let request = json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"});

        let first = serde_json::to_string(&call(&server, request.clone()).await).unwrap();
        let second = serde_json::to_string(&call(&server, request).await).unwrap();

        assert_eq!(first, second);
        let value: Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["result"]["tools"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, code::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: resources/list");
        assert_eq!(response.id, json!(5));
    }

    #[tokio::test]
    async fn test_unknown_tool_keeps_id() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": "req-9", "method": "tools/call",
                   "params": {"name": "cq_mint", "arguments": {}}}),
        )
        .await;

        assert_eq!(response.id, json!("req-9"));
        assert_eq!(response.jsonrpc, "2.0");
        assert_eq!(response.error.unwrap().code, code::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_arguments_is_invalid_params() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "cq_validate"}}),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, code::INVALID_PARAMS);
        assert_eq!(error.message, "Invalid params: arguments required");
    }

    #[tokio::test]
    async fn test_missing_params_is_invalid_params() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call"}),
        )
        .await;

        assert_eq!(response.error.unwrap().code, code::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_schema_violations_are_reported_in_data() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call",
                   "params": {"name": "cq_query", "arguments": {"input": "", "format": "xml"}}}),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, code::INVALID_PARAMS);
        assert_eq!(error.message, "Invalid arguments for cq_query");
        let mut paths: Vec<String> = error
            .data
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["path"].as_str().unwrap().to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["format", "input"]);
    }

    #[tokio::test]
    async fn test_validate_exit_code_one_is_a_result() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "cq_validate", "arguments": {"input": "00deadbeef"}}}),
        )
        .await;

        assert!(response.error.is_none());
        assert_eq!(
            response.result.unwrap(),
            json!({"content": [{"type": "text", "text": "{\"valid\":false}"}]})
        );
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_internal_error() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "cq_validate", "arguments": {"input": "ffdeadbeef"}}}),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, code::INTERNAL_ERROR);
        assert_eq!(error.message, "Tool execution failed");
        assert_eq!(error.data, Some(json!("decoder crashed\n")));
    }

    #[tokio::test]
    async fn test_absent_id_is_answered_with_null() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "method": "tools/list"}),
        )
        .await;

        assert_eq!(response.id, Value::Null);
        assert!(response.result.is_some());
    }
}
