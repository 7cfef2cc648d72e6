mod call;
mod catalog;

pub use call::{DecodeAddressArgs, QueryArgs, ToolCall, ToolError, ValidateArgs};
pub use catalog::{
    catalog, json_schema_boolean, json_schema_enum, json_schema_object,
    json_schema_required_string, json_schema_string, ArgumentValidators, CqTool,
    ADDRESS_DESCRIPTION,
};
