//! Base64url (no padding) helpers shared by the JWT, disclosure, and status
//! list encodings.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;

use crate::error::{SdJwtError, SdJwtResult};

/// Encode bytes as base64url without padding.
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode base64url without padding.
pub fn b64url_decode(data: &str) -> SdJwtResult<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(data)?)
}

/// Serialize a JSON value compactly and base64url-encode it.
pub fn b64url_encode_json(value: &Value) -> String {
    b64url_encode(value.to_string())
}

/// Decode a base64url segment and parse it as JSON.
pub fn b64url_decode_json(segment: &str) -> SdJwtResult<Value> {
    let bytes = b64url_decode(segment)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode a base64url segment that must hold a JSON object.
pub fn b64url_decode_object(
    segment: &str,
    what: &str,
) -> SdJwtResult<serde_json::Map<String, Value>> {
    match b64url_decode_json(segment)? {
        Value::Object(map) => Ok(map),
        other => Err(SdJwtError::Malformed(format!(
            "{what} must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
