//! Base64 encoding for serialized transactions.
//!
//! Wallets and RPC nodes exchange transactions as standard base64 strings.
//! [`Base64Bytes`] holds the encoded form so that callers can pass it around
//! without caring whether it was produced locally or received from a peer.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use std::fmt::Display;

/// Base64-encoded bytes.
///
/// ```rust
/// use solana_pay_types::util::Base64Bytes;
///
/// let encoded = Base64Bytes::encode(b"hello world");
/// assert_eq!(encoded.to_string(), "aGVsbG8gd29ybGQ=");
/// assert_eq!(encoded.decode().unwrap(), b"hello world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(String);

impl Base64Bytes {
    /// Encodes raw bytes.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(b64.encode(input.as_ref()))
    }

    /// Decodes back to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(self.0.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Base64Bytes {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for Base64Bytes {
    fn from(value: String) -> Self {
        Self(value.trim().to_string())
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Base64Bytes::from("not base64!").decode().is_err());
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let encoded = Base64Bytes::from("  AQID\n".to_string());
        assert_eq!(encoded.decode().unwrap(), vec![1, 2, 3]);
    }
}
