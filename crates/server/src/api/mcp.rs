// JSON-RPC endpoint: envelope errors are HTTP 400, everything the
// dispatcher answers is HTTP 200

use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cqgate_mcp::protocol::{parse_envelope, JsonRpcError, JsonRpcResponse};
use serde_json::Value;
use std::sync::Arc;

pub async fn handle(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // An unreadable body (e.g. over the size limit) is a parse error
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(status = %rejection.status(), "Unreadable MCP body");
            let error = JsonRpcError::parse_error().with_data(rejection.body_text());
            return (rejection.status(), Json(JsonRpcResponse::error(Value::Null, error)))
                .into_response();
        }
    };

    match parse_envelope(&body) {
        Ok(request) => {
            let response = state.mcp.handle_request(request).await;
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(rejected) => {
            tracing::debug!(
                code = rejected.error.as_ref().map(|e| e.code),
                "Rejected MCP envelope"
            );
            (StatusCode::BAD_REQUEST, Json(rejected)).into_response()
        }
    }
}

pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(JsonRpcResponse::error(
            Value::Null,
            JsonRpcError::invalid_request(),
        )),
    )
        .into_response()
}

pub async fn disabled() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(JsonRpcResponse::error(
            Value::Null,
            JsonRpcError::service_disabled(),
        )),
    )
        .into_response()
}
