// JSON Schema checks for tool arguments and request bodies

use jsonschema::error::ValidationErrorKind;
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One schema violation, addressed by a dotted field path
///
/// The path is empty when the document itself is at fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("failed to compile schema for '{name}': {message}")]
pub struct SchemaError {
    pub name: String,
    pub message: String,
}

/// A schema compiled once and reused for every check
pub struct CompiledSchema {
    name: String,
    validator: JSONSchema,
}

impl CompiledSchema {
    pub fn compile(name: impl Into<String>, schema: &Value) -> Result<Self, SchemaError> {
        let name = name.into();
        let validator = JSONSchema::compile(schema).map_err(|error| SchemaError {
            name: name.clone(),
            message: error.to_string(),
        })?;

        Ok(Self { name, validator })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check `instance`, reporting every violation
    pub fn check(&self, instance: &Value) -> Result<(), Vec<SchemaViolation>> {
        self.validator
            .validate(instance)
            .map_err(|errors| errors.map(violation).collect())
    }
}

fn violation(error: ValidationError<'_>) -> SchemaViolation {
    let message = error.to_string();
    let mut segments = error.instance_path.into_vec();

    // A missing property is reported on its parent object
    if let ValidationErrorKind::Required { property } = error.kind {
        match property {
            Value::String(name) => segments.push(name),
            other => segments.push(other.to_string()),
        }
    }

    SchemaViolation {
        path: segments.join("."),
        message,
    }
}
