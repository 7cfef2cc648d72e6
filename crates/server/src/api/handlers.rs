use super::validation::parse_body;
use super::{ApiError, ApiResult};
use crate::config::AppState;
use axum::{body::Bytes, extract::rejection::BytesRejection, extract::State, Json};
use cqgate_core::{DecoderInput, QueryFormat, QueryOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Query a transaction
pub async fn query(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ResultResponse>> {
    let req: QueryRequest = parse_body(&state.schemas.query, &body?)?;

    let input = DecoderInput::parse(&req.input);
    let options = QueryOptions {
        format: req.format,
        ada: req.ada.unwrap_or(false),
    };

    tracing::debug!(query = ?req.query, binary_input = input.is_bytes(), "Querying transaction");

    let output = state
        .decoder
        .query(&input, req.query.as_deref(), options)
        .await
        .map_err(|e| ApiError::from_bridge("Query failed", e))?;

    let result = if options.wants_json() {
        parse_json_output(&output)?
    } else {
        Value::String(output)
    };

    Ok(Json(ResultResponse::new(result)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    pub input: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub format: Option<QueryFormat>,
    #[serde(default)]
    pub ada: Option<bool>,
}

/// Decode a bech32 address
pub async fn decode_address(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ResultResponse>> {
    let req: AddressRequest = parse_body(&state.schemas.address, &body?)?;

    let output = state
        .decoder
        .decode_address(&req.address, req.json)
        .await
        .map_err(|e| ApiError::from_bridge("Address decode failed", e))?;

    let result = if req.json {
        parse_json_output(&output)?
    } else {
        Value::String(output)
    };

    Ok(Json(ResultResponse::new(result)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressRequest {
    pub address: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

fn default_json() -> bool {
    true
}

/// Check whether a transaction is valid
///
/// An invalid verdict is a successful response; only decoder failures
/// other than exit code 1 are errors.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ValidateResponse>> {
    let req: ValidateRequest = parse_body(&state.schemas.validate, &body?)?;

    let input = DecoderInput::parse(&req.input);

    let valid = state
        .decoder
        .validate(&input)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ValidateResponse {
        success: true,
        valid,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub success: bool,
    pub result: Value,
}

impl ResultResponse {
    fn new(result: Value) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub valid: bool,
}

fn parse_json_output(output: &str) -> ApiResult<Value> {
    serde_json::from_str(output)
        .map_err(|e| ApiError::Internal(format!("cq returned malformed JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_request_defaults_to_json() {
        let req: AddressRequest = serde_json::from_str(r#"{"address":"addr1q"}"#).unwrap();

        assert!(req.json);
    }

    #[test]
    fn test_malformed_decoder_json_is_internal() {
        let err = parse_json_output("not json").unwrap_err();

        assert!(matches!(err, ApiError::Internal(m) if m.starts_with("cq returned malformed JSON")));
    }
}
