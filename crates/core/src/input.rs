// Caller-side input normalization before anything reaches the bridge

use std::fmt;

/// Shortest string (after any `0x` prefix) treated as hex-encoded CBOR
///
/// Length alone is not enough: an odd number of digits, e.g. 17, cannot
/// form whole bytes, so such a run stays text instead of losing a digit.
pub const MIN_HEX_LEN: usize = 16;

/// Decoder input after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderInput {
    /// Raw transaction bytes, re-encoded as lowercase hex for the decoder
    Bytes(Vec<u8>),
    /// Anything that is not hex-like, e.g. a bech32 address
    Text(String),
}

impl DecoderInput {
    /// Normalize user-supplied input
    ///
    /// A string with an optional `0x` prefix followed by at least
    /// [`MIN_HEX_LEN`] hex digits is decoded to bytes. Odd-length digit runs
    /// cannot form whole bytes and are kept as text.
    pub fn parse(input: &str) -> Self {
        let digits = strip_hex_prefix(input);
        if looks_like_hex(digits) {
            if let Ok(bytes) = hex::decode(digits) {
                return Self::Bytes(bytes);
            }
        }
        Self::Text(input.to_string())
    }

    /// The value passed to the decoder as a positional argument
    pub fn to_argument(&self) -> String {
        match self {
            Self::Bytes(bytes) => hex::encode(bytes),
            Self::Text(text) => strip_hex_prefix(text).to_string(),
        }
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }
}

impl From<Vec<u8>> for DecoderInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for DecoderInput {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl fmt::Display for DecoderInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_argument())
    }
}

fn strip_hex_prefix(input: &str) -> &str {
    input.strip_prefix("0x").unwrap_or(input)
}

fn looks_like_hex(digits: &str) -> bool {
    digits.len() >= MIN_HEX_LEN && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_hex_becomes_bytes() {
        let input = DecoderInput::parse("84a300818258200000");

        assert!(input.is_bytes());
        assert_eq!(input.to_argument(), "84a300818258200000");
    }

    #[test]
    fn test_prefix_is_accepted_and_case_normalized() {
        let input = DecoderInput::parse("0xDEADBEEFCAFEBABE");

        assert_eq!(
            input,
            DecoderInput::Bytes(vec![0xde, 0xad, 0xbe, 0xef, 0xca, 0xfe, 0xba, 0xbe])
        );
        assert_eq!(input.to_argument(), "deadbeefcafebabe");
    }

    #[test]
    fn test_short_hex_passes_through() {
        let input = DecoderInput::parse("deadbeef");

        assert_eq!(input, DecoderInput::Text("deadbeef".to_string()));
        assert_eq!(input.to_argument(), "deadbeef");
    }

    #[test]
    fn test_short_prefixed_text_loses_prefix_only_as_argument() {
        let input = DecoderInput::parse("0xabc");

        assert_eq!(input, DecoderInput::Text("0xabc".to_string()));
        assert_eq!(input.to_argument(), "abc");
    }

    #[test]
    fn test_address_is_not_hex_encoded() {
        let address = "addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x";
        let input = DecoderInput::parse(address);

        assert_eq!(input.to_argument(), address);
        assert!(!input.is_bytes());
    }

    #[test]
    fn test_odd_length_hex_stays_text() {
        let input = DecoderInput::parse("84a30081825820000");

        assert!(!input.is_bytes());
        assert_eq!(input, DecoderInput::Text("84a30081825820000".to_string()));
    }

    #[test]
    fn test_raw_bytes_are_hex_encoded() {
        let input = DecoderInput::from(vec![0x84, 0xa3, 0x00]);

        assert_eq!(input.to_string(), "84a300");
    }
}
