// Shared types for decoder calls

use serde::{Deserialize, Serialize};

/// Output format requested from the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryFormat {
    Json,
    Raw,
    Pretty,
}

impl QueryFormat {
    /// Command-line flag for this format; `Pretty` is the decoder default
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("--json"),
            Self::Raw => Some("--raw"),
            Self::Pretty => None,
        }
    }
}

/// Options for a query call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub format: Option<QueryFormat>,
    /// Show ADA amounts instead of lovelace
    #[serde(default)]
    pub ada: bool,
}

impl QueryOptions {
    pub fn wants_json(&self) -> bool {
        self.format == Some(QueryFormat::Json)
    }
}
