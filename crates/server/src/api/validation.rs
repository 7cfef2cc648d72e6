// Request body schemas and the JSON Schema check every body goes through

use super::{ApiError, FieldError};
use cqgate_mcp::schema::{CompiledSchema, SchemaError, SchemaViolation};
use cqgate_mcp::tools::{
    json_schema_boolean, json_schema_object, json_schema_required_string, CqTool,
    ADDRESS_DESCRIPTION,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Compiled schemas for the REST request bodies
///
/// Query and validate bodies share the MCP tool schemas, so both surfaces
/// accept the same documents.
pub struct RequestSchemas {
    pub query: CompiledSchema,
    pub address: CompiledSchema,
    pub validate: CompiledSchema,
}

impl RequestSchemas {
    pub fn compile() -> Result<Self, SchemaError> {
        Ok(Self {
            query: CompiledSchema::compile(
                "query request",
                &CqTool::Query.schema().input_schema,
            )?,
            address: CompiledSchema::compile("address request", &address_schema())?,
            validate: CompiledSchema::compile(
                "validate request",
                &CqTool::Validate.schema().input_schema,
            )?,
        })
    }
}

/// Address bodies add the `json` switch the MCP tool does not expose
fn address_schema() -> Value {
    json_schema_object(
        json!({
            "address": json_schema_required_string(ADDRESS_DESCRIPTION),
            "json": json_schema_boolean("Return structured JSON (default true)"),
        }),
        vec!["address"],
    )
}

impl From<SchemaViolation> for FieldError {
    fn from(violation: SchemaViolation) -> Self {
        Self {
            path: violation.path,
            message: violation.message,
        }
    }
}

/// Parse a JSON body, check it against `schema`, then decode it
///
/// Unknown fields are ignored. A body that is not JSON at all is reported
/// with an empty path.
pub fn parse_body<T>(schema: &CompiledSchema, body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        ApiError::Validation(vec![FieldError {
            path: String::new(),
            message: format!("Malformed JSON body: {}", e),
        }])
    })?;

    if let Err(violations) = schema.check(&value) {
        tracing::debug!(schema = schema.name(), count = violations.len(), "Request body rejected");
        return Err(ApiError::Validation(
            violations.into_iter().map(FieldError::from).collect(),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        ApiError::Validation(vec![FieldError {
            path: String::new(),
            message: e.to_string(),
        }])
    })
}
