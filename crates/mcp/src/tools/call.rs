// Typed tool invocations and their execution against the decoder

use crate::protocol::{CallToolResult, JsonRpcError};
use crate::tools::{ArgumentValidators, CqTool};
use cqgate_core::{BridgeError, CqDecoder, DecoderInput, QueryFormat, QueryOptions};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryArgs {
    pub input: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub format: Option<QueryFormat>,
    #[serde(default)]
    pub ada: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecodeAddressArgs {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateArgs {
    pub input: String,
}

/// A tools/call request whose arguments matched the tool's schema
#[derive(Debug, Clone)]
pub enum ToolCall {
    Query(QueryArgs),
    DecodeAddress(DecodeAddressArgs),
    Validate(ValidateArgs),
}

/// Failure while running a tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Decoder(#[from] BridgeError),

    #[error("cq returned malformed JSON: {0}")]
    MalformedOutput(#[from] serde_json::Error),
}

impl ToolCall {
    /// Check `arguments` against the tool's advertised schema, then decode
    /// them into the typed shape for `tool`
    pub fn decode(
        tool: CqTool,
        arguments: Value,
        validators: &ArgumentValidators,
    ) -> Result<Self, JsonRpcError> {
        validators
            .for_tool(tool)
            .check(&arguments)
            .map_err(|violations| invalid_arguments(tool).with_data(json!(violations)))?;

        let call = match tool {
            CqTool::Query => Self::Query(parse_args(tool, arguments)?),
            CqTool::DecodeAddress => Self::DecodeAddress(parse_args(tool, arguments)?),
            CqTool::Validate => Self::Validate(parse_args(tool, arguments)?),
        };
        Ok(call)
    }

    /// Run the call and wrap the outcome as a single text block
    pub async fn execute(self, decoder: &CqDecoder) -> Result<CallToolResult, ToolError> {
        match self {
            Self::Query(args) => {
                let input = DecoderInput::parse(&args.input);
                let options = QueryOptions {
                    format: args.format,
                    ada: args.ada.unwrap_or(false),
                };
                let output = decoder
                    .query(&input, args.query.as_deref(), options)
                    .await?;
                Ok(CallToolResult::text(output))
            }
            Self::DecodeAddress(args) => {
                let output = decoder.decode_address(&args.address, true).await?;
                let parsed: Value = serde_json::from_str(&output)?;
                Ok(CallToolResult::text(serde_json::to_string_pretty(&parsed)?))
            }
            Self::Validate(args) => {
                let valid = decoder
                    .validate(&DecoderInput::parse(&args.input))
                    .await?;
                Ok(CallToolResult::text(
                    serde_json::json!({ "valid": valid }).to_string(),
                ))
            }
        }
    }
}

fn invalid_arguments(tool: CqTool) -> JsonRpcError {
    JsonRpcError::invalid_params(format!("Invalid arguments for {}", tool.name()))
}

fn parse_args<T: DeserializeOwned>(tool: CqTool, arguments: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments)
        .map_err(|e| invalid_arguments(tool).with_data(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::code;

    fn decode(tool: CqTool, arguments: Value) -> Result<ToolCall, JsonRpcError> {
        ToolCall::decode(tool, arguments, &ArgumentValidators::compile().unwrap())
    }

    fn violation_paths(err: &JsonRpcError) -> Vec<String> {
        let mut paths: Vec<String> = err
            .data
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v["path"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        paths.sort();
        paths
    }

    #[test]
    fn test_decode_query_args() {
        let call = decode(
            CqTool::Query,
            json!({"input": "84a3", "query": "fee", "format": "json", "ada": true}),
        )
        .unwrap();

        match call {
            ToolCall::Query(args) => {
                assert_eq!(args.query.as_deref(), Some("fee"));
                assert_eq!(args.format, Some(QueryFormat::Json));
                assert_eq!(args.ada, Some(true));
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field_is_invalid_params() {
        let err = decode(CqTool::Validate, json!({"query": "fee"})).unwrap_err();

        assert_eq!(err.code, code::INVALID_PARAMS);
        assert!(err.message.contains("cq_validate"));
        assert_eq!(violation_paths(&err), vec!["input"]);
    }

    #[test]
    fn test_wrong_type_is_invalid_params() {
        let err = decode(CqTool::Query, json!({"input": 42})).unwrap_err();
        assert_eq!(err.code, code::INVALID_PARAMS);
        assert_eq!(violation_paths(&err), vec!["input"]);

        let err = decode(CqTool::Query, json!({"input": "84a3", "format": "xml", "ada": "yes"}))
            .unwrap_err();
        assert_eq!(err.code, code::INVALID_PARAMS);
        assert_eq!(violation_paths(&err), vec!["ada", "format"]);
    }

    #[test]
    fn test_empty_address_is_rejected() {
        let err = decode(CqTool::DecodeAddress, json!({"address": ""})).unwrap_err();

        assert_eq!(err.code, code::INVALID_PARAMS);
        assert_eq!(violation_paths(&err), vec!["address"]);
    }

    #[test]
    fn test_non_object_arguments_are_rejected() {
        let err = decode(CqTool::Validate, json!("84a3")).unwrap_err();

        assert_eq!(err.code, code::INVALID_PARAMS);
        assert_eq!(violation_paths(&err), vec![""]);
    }

    #[cfg(unix)]
    mod with_fake_decoder {
        use super::*;
        use crate::protocol::ToolContent;
        use cqgate_core::testing::fake_decoder;

        fn text(result: CallToolResult) -> String {
            match result.content.into_iter().next() {
                Some(ToolContent::Text { text }) => text,
                None => panic!("empty tool result"),
            }
        }

        #[tokio::test]
        async fn test_validate_reports_false_for_exit_code_one() {
            let call = decode(CqTool::Validate, json!({"input": "00deadbeef"})).unwrap();

            let result = call.execute(&fake_decoder()).await.unwrap();

            assert_eq!(text(result), r#"{"valid":false}"#);
        }

        #[tokio::test]
        async fn test_decode_address_is_pretty_printed() {
            let call =
                decode(CqTool::DecodeAddress, json!({"address": "addr1abc"})).unwrap();

            let output = text(call.execute(&fake_decoder()).await.unwrap());

            assert!(output.contains("\n  \"address\": \"addr1abc\""));
        }

        #[tokio::test]
        async fn test_query_text_is_verbatim() {
            let call = decode(
                CqTool::Query,
                json!({"input": "0x84a300818258200000", "query": "fee"}),
            )
            .unwrap();

            let output = text(call.execute(&fake_decoder()).await.unwrap());

            assert_eq!(output, "170000\n");
        }

        #[tokio::test]
        async fn test_decoder_failure_surfaces_as_tool_error() {
            let call = decode(CqTool::Validate, json!({"input": "ffdeadbeef"})).unwrap();

            let err = call.execute(&fake_decoder()).await.unwrap_err();

            assert!(matches!(err, ToolError::Decoder(_)));
            assert_eq!(err.to_string(), "decoder crashed\n");
        }
    }
}
