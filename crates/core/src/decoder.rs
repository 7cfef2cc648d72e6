// The three decoder call shapes built on the process bridge

use crate::bridge::{BridgeError, ProcessBridge, ProcessInvocation};
use crate::input::DecoderInput;
use crate::types::QueryOptions;

/// Exit code the decoder uses for "recognized, but not a valid transaction"
pub const INVALID_EXIT_CODE: i32 = 1;

/// High-level client for the cq decoder
#[derive(Debug, Clone)]
pub struct CqDecoder {
    bridge: ProcessBridge,
}

impl CqDecoder {
    pub fn new(bridge: ProcessBridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &ProcessBridge {
        &self.bridge
    }

    /// Query a transaction, optionally narrowing to a query path
    ///
    /// Returns the decoder's stdout verbatim; interpreting JSON output is
    /// left to the caller.
    pub async fn query(
        &self,
        input: &DecoderInput,
        query: Option<&str>,
        options: QueryOptions,
    ) -> Result<String, BridgeError> {
        let args = query_arguments(input, query, options);
        self.bridge.invoke(&ProcessInvocation::new(args)).await
    }

    /// Decode a bech32 address
    pub async fn decode_address(&self, address: &str, json: bool) -> Result<String, BridgeError> {
        let args = address_arguments(address, json);
        self.bridge.invoke(&ProcessInvocation::new(args)).await
    }

    /// Check a transaction
    ///
    /// Exit code 1 is an ordinary "invalid" verdict; any other failure is
    /// propagated as an error.
    pub async fn validate(&self, input: &DecoderInput) -> Result<bool, BridgeError> {
        match self
            .bridge
            .invoke(&ProcessInvocation::new(validate_arguments(input)))
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.exit_code() == Some(INVALID_EXIT_CODE) => {
                tracing::debug!("Decoder rejected transaction as invalid");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Ask the decoder for its version string
    pub async fn version(&self) -> Result<String, BridgeError> {
        let output = self
            .bridge
            .invoke(&ProcessInvocation::new(["--version"]))
            .await?;
        Ok(output.trim().to_string())
    }
}

/// `[--json|--raw] [--ada] [query] <input>`
pub fn query_arguments(
    input: &DecoderInput,
    query: Option<&str>,
    options: QueryOptions,
) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(flag) = options.format.and_then(|f| f.flag()) {
        args.push(flag.to_string());
    }
    if options.ada {
        args.push("--ada".to_string());
    }
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        args.push(query.to_string());
    }
    args.push(input.to_argument());

    args
}

/// `addr <address> [--json]`
pub fn address_arguments(address: &str, json: bool) -> Vec<String> {
    let mut args = vec!["addr".to_string(), address.to_string()];
    if json {
        args.push("--json".to_string());
    }
    args
}

/// `--check <input>`
pub fn validate_arguments(input: &DecoderInput) -> Vec<String> {
    vec!["--check".to_string(), input.to_argument()]
}
