//! Typed codecs for cache payloads.
//!
//! The wire formats are fixed for interoperability with entries written by
//! earlier deployments: structured payloads are JSON text, completion flags
//! are the literal strings `"true"` and `"false"`. Encoding and decoding go
//! through these functions so the formats live in exactly one place.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

const FLAG_TRUE: &str = "true";
const FLAG_FALSE: &str = "false";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cache payload could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("cache payload could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode a boolean completion flag to its wire sentinel.
pub fn encode_flag(value: bool) -> &'static str {
    if value { FLAG_TRUE } else { FLAG_FALSE }
}

/// Decode a completion flag sentinel. Anything but the two known sentinels
/// is an unrecognized payload and decodes to `None`.
pub fn decode_flag(raw: &str) -> Option<bool> {
    match raw {
        FLAG_TRUE => Some(true),
        FLAG_FALSE => Some(false),
        _ => None,
    }
}

/// Encode a structured payload as JSON text.
pub fn encode_json<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Encode)
}

/// Decode a structured payload from JSON text.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
    serde_json::from_str(raw).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_sentinels_are_the_literal_strings() {
        assert_eq!(encode_flag(true), "true");
        assert_eq!(encode_flag(false), "false");
    }

    #[test]
    fn flag_decoding_round_trips() {
        assert_eq!(decode_flag(encode_flag(true)), Some(true));
        assert_eq!(decode_flag(encode_flag(false)), Some(false));
    }

    #[test]
    fn unknown_flag_payloads_decode_to_none() {
        assert_eq!(decode_flag("True"), None);
        assert_eq!(decode_flag("1"), None);
        assert_eq!(decode_flag(""), None);
    }

    #[test]
    fn corrupt_json_is_a_decode_error() {
        let result: Result<serde_json::Value, _> = decode_json("{not json");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
