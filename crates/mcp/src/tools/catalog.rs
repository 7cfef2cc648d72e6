// Fixed tool catalog advertised through tools/list

use crate::protocol::ToolSchema;
use crate::schema::{CompiledSchema, SchemaError};
use serde_json::{json, Value};
use std::sync::OnceLock;

const INPUT_DESCRIPTION: &str = "Transaction CBOR as hex string (with or without 0x prefix)";
pub const ADDRESS_DESCRIPTION: &str = "Cardano address in bech32 format (e.g., addr1..., stake1...)";

/// The tools this server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CqTool {
    Query,
    DecodeAddress,
    Validate,
}

impl CqTool {
    /// Catalog order, which is also the tools/list order
    pub const ALL: [CqTool; 3] = [CqTool::Query, CqTool::DecodeAddress, CqTool::Validate];

    pub fn name(self) -> &'static str {
        match self {
            Self::Query => "cq_query",
            Self::DecodeAddress => "cq_decode_address",
            Self::Validate => "cq_validate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn schema(self) -> ToolSchema {
        match self {
            Self::Query => ToolSchema {
                name: self.name().to_string(),
                description: "Query a Cardano CBOR transaction with optional query path"
                    .to_string(),
                input_schema: json_schema_object(
                    json!({
                        "input": json_schema_required_string(INPUT_DESCRIPTION),
                        "query": json_schema_string(
                            "Optional query path (e.g., \"fee\", \"outputs.0.address\", \"outputs.*.value\")"
                        ),
                        "format": json_schema_enum(&["json", "raw", "pretty"], "Output format"),
                        "ada": json_schema_boolean("Display ADA amounts instead of lovelace"),
                    }),
                    vec!["input"],
                ),
            },
            Self::DecodeAddress => ToolSchema {
                name: self.name().to_string(),
                description: "Decode a Cardano bech32 address".to_string(),
                input_schema: json_schema_object(
                    json!({
                        "address": json_schema_required_string(ADDRESS_DESCRIPTION),
                    }),
                    vec!["address"],
                ),
            },
            Self::Validate => ToolSchema {
                name: self.name().to_string(),
                description: "Validate a Cardano CBOR transaction".to_string(),
                input_schema: json_schema_object(
                    json!({
                        "input": json_schema_required_string(INPUT_DESCRIPTION),
                    }),
                    vec!["input"],
                ),
            },
        }
    }
}

/// All tool descriptors, built once per process
pub fn catalog() -> &'static [ToolSchema] {
    static CATALOG: OnceLock<Vec<ToolSchema>> = OnceLock::new();
    CATALOG.get_or_init(|| CqTool::ALL.into_iter().map(CqTool::schema).collect())
}

/// Input schemas of every tool, compiled once
///
/// Arguments are checked against exactly what tools/list advertises.
pub struct ArgumentValidators {
    query: CompiledSchema,
    decode_address: CompiledSchema,
    validate: CompiledSchema,
}

impl ArgumentValidators {
    pub fn compile() -> Result<Self, SchemaError> {
        let compile = |tool: CqTool| {
            CompiledSchema::compile(tool.name(), &tool.schema().input_schema)
        };

        Ok(Self {
            query: compile(CqTool::Query)?,
            decode_address: compile(CqTool::DecodeAddress)?,
            validate: compile(CqTool::Validate)?,
        })
    }

    pub fn for_tool(&self, tool: CqTool) -> &CompiledSchema {
        match tool {
            CqTool::Query => &self.query,
            CqTool::DecodeAddress => &self.decode_address,
            CqTool::Validate => &self.validate,
        }
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}

/// A string that must be present and non-empty
pub fn json_schema_required_string(description: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": description
    })
}

pub fn json_schema_boolean(description: &str) -> Value {
    json!({
        "type": "boolean",
        "description": description
    })
}

pub fn json_schema_enum(values: &[&str], description: &str) -> Value {
    json!({
        "type": "string",
        "enum": values,
        "description": description
    })
}
