//! Transaction calldata.
//!
//! Accepts either `0x`-prefixed hex or plain text, which is sent as its UTF-8
//! bytes (the usual inscription form, e.g. `data:,{"p":"asc-20",...}`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload is empty")]
    Empty,

    #[error("payload is not valid hex: {0}")]
    InvalidHex(String),
}

/// Calldata bytes sent with every transaction of a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn parse(input: &str) -> Result<Self, PayloadError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PayloadError::Empty);
        }

        match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
            Some(body) => hex::decode(body)
                .map(Self)
                .map_err(|e| PayloadError::InvalidHex(e.to_string())),
            None => Ok(Self(input.as_bytes().to_vec())),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let payload = Payload::parse("0xdeadBEEF").unwrap();
        assert_eq!(payload.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(payload.to_hex(), "0xdeadbeef");
    }

    #[test]
    fn test_parse_bare_prefix_is_empty_calldata() {
        let payload = Payload::parse("0x").unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.to_hex(), "0x");
    }

    #[test]
    fn test_parse_text() {
        let payload = Payload::parse(r#"data:,{"p":"asc-20","op":"mint"}"#).unwrap();
        assert_eq!(payload.as_bytes(), br#"data:,{"p":"asc-20","op":"mint"}"#);
        assert!(payload.to_hex().starts_with("0x646174613a2c"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Payload::parse(""), Err(PayloadError::Empty));
        assert_eq!(Payload::parse(" \n"), Err(PayloadError::Empty));
        assert!(matches!(Payload::parse("0xabc"), Err(PayloadError::InvalidHex(_))));
        assert!(matches!(Payload::parse("0xzz"), Err(PayloadError::InvalidHex(_))));
    }
}
