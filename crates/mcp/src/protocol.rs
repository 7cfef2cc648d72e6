// MCP protocol types and definitions (JSON-RPC 2.0)

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 error codes
pub mod code {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Server-defined: the RPC surface is switched off
    pub const SERVICE_DISABLED: i32 = -32000;
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Requests without an id expect no response
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id to echo back; absent ids are answered with `null`
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// JSON-RPC 2.0 Response
///
/// Constructed only through [`JsonRpcResponse::success`] and
/// [`JsonRpcResponse::error`], so exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: impl Into<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: impl Into<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn parse_error() -> Self {
        Self::custom(code::PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::custom(code::INVALID_REQUEST, "Invalid Request")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::custom(code::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn tool_not_found(name: &str) -> Self {
        Self::custom(code::METHOD_NOT_FOUND, format!("Tool not found: {}", name))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::custom(code::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::custom(code::INTERNAL_ERROR, message)
    }

    pub fn service_disabled() -> Self {
        Self::custom(code::SERVICE_DISABLED, "MCP server is disabled")
    }

    pub fn custom(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Validate a raw message body and extract the request
///
/// On failure the returned response is ready to send: `-32700` when the
/// body is not JSON, `-32600` when the envelope is malformed, carrying
/// whatever id could be salvaged.
pub fn parse_envelope(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        JsonRpcResponse::error(
            Value::Null,
            JsonRpcError::parse_error().with_data(e.to_string()),
        )
    })?;

    let Value::Object(mut object) = value else {
        return Err(JsonRpcResponse::error(
            Value::Null,
            JsonRpcError::invalid_request(),
        ));
    };

    let id = match object.remove("id") {
        None => None,
        Some(id @ (Value::String(_) | Value::Number(_) | Value::Null)) => Some(id),
        Some(_) => {
            return Err(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request(),
            ))
        }
    };
    let salvaged_id = id.clone().unwrap_or(Value::Null);

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcResponse::error(
            salvaged_id,
            JsonRpcError::invalid_request(),
        ));
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => {
            return Err(JsonRpcResponse::error(
                salvaged_id,
                JsonRpcError::invalid_request(),
            ))
        }
    };

    Ok(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        method,
        params: object.remove("params"),
    })
}

// MCP-specific protocol messages

/// Tool definition for MCP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// List tools response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolSchema>,
}

/// Call tool request params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Call tool response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// A result holding a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Initialize request params; every field is optional for lenient clients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: Option<String>,
    #[serde(rename = "clientInfo", default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Initialize response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected(body: &str) -> JsonRpcResponse {
        parse_envelope(body.as_bytes()).unwrap_err()
    }

    #[test]
    fn test_parse_valid_envelope() {
        let request = parse_envelope(
            br#"{"jsonrpc":"2.0","id":"abc","method":"tools/list","params":{}}"#,
        )
        .unwrap();

        assert_eq!(request.id, Some(json!("abc")));
        assert_eq!(request.method, "tools/list");
        assert_eq!(request.params, Some(json!({})));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_unparseable_body_is_parse_error() {
        let response = rejected("{not json");
        let error = response.error.unwrap();

        assert_eq!(error.code, code::PARSE_ERROR);
        assert_eq!(error.message, "Parse error");
        assert!(error.data.is_some());
        assert_eq!(response.id, Value::Null);
    }

    #[test]
    fn test_wrong_version_salvages_id() {
        let response = rejected(r#"{"jsonrpc":"1.0","id":7,"method":"initialize"}"#);

        assert_eq!(response.id, json!(7));
        assert_eq!(response.error.unwrap().code, code::INVALID_REQUEST);
    }

    #[test]
    fn test_missing_method_is_invalid_request() {
        let response = rejected(r#"{"jsonrpc":"2.0","id":"x"}"#);

        assert_eq!(response.id, json!("x"));
        assert_eq!(response.error.unwrap().code, code::INVALID_REQUEST);
    }

    #[test]
    fn test_non_object_is_invalid_request() {
        let response = rejected("[1,2,3]");

        assert_eq!(response.error.unwrap().code, code::INVALID_REQUEST);
    }

    #[test]
    fn test_response_has_exactly_one_of_result_or_error() {
        let ok = serde_json::to_value(JsonRpcResponse::success(1, json!({}))).unwrap();
        let err = serde_json::to_value(JsonRpcResponse::error(
            1,
            JsonRpcError::internal_error("boom"),
        ))
        .unwrap();

        assert!(ok.get("result").is_some() && ok.get("error").is_none());
        assert!(err.get("error").is_some() && err.get("result").is_none());
        assert_eq!(ok["jsonrpc"], "2.0");
    }

    #[test]
    fn test_tool_content_serializes_with_type_tag() {
        let value = serde_json::to_value(CallToolResult::text("170000")).unwrap();

        assert_eq!(value, json!({"content": [{"type": "text", "text": "170000"}]}));
    }
}
