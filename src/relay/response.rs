//! Interpret buffered upstream responses.

use serde_json::Value;

use crate::error::{RelayError, Result};

/// Longest raw-body excerpt, in characters, used as an error detail.
pub const MAX_DETAIL_CHARS: usize = 500;

/// Best-effort error detail from a failed upstream response body.
///
/// A JSON object with an `error` member yields that member (strings as is, anything
/// else rendered as JSON). Other JSON yields the whole body. Non-JSON yields the first
/// [`MAX_DETAIL_CHARS`] characters.
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Ok(_) => body.to_string(),
        Err(_) => truncate_chars(body, MAX_DETAIL_CHARS).to_string(),
    }
}

/// Build the error for a non-success upstream status.
pub fn status_error(status: u16, body: &str) -> RelayError {
    RelayError::upstream_http(status, error_detail(body))
}

/// Decode a successful upstream body. Anything that isn't JSON means the upstream is
/// misbehaving.
pub fn decode_success(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| RelayError::decode(e.to_string()))
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
