//! Response envelope handling.
//!
//! Every Xandr reply nests its payload under a top-level `response` key:
//!
//! ```json
//! {"response": {"status": "OK", "advertiser": {"id": 1, "name": "Acme"}}}
//! ```
//!
//! Failures arrive either as a non-2xx status or as a 2xx reply whose
//! envelope has `"status": "error"` plus `error_id` and `error`.

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::http::HttpResponse;

/// Map a non-success status to `ApiError::Http`.
pub(crate) fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.text(),
    })
}

/// Decode the whole body as JSON after checking the status.
pub fn parse_body(response: &HttpResponse) -> Result<Value> {
    check_status(response)?;
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Decode the body and return the object under `response`.
pub fn parse_envelope(response: &HttpResponse) -> Result<Value> {
    let mut body = parse_body(response)?;
    let inner = body
        .get_mut("response")
        .map(Value::take)
        .ok_or_else(|| ApiError::missing("response"))?;

    if inner.get("status").and_then(Value::as_str) == Some("error") {
        let error_id = inner
            .get("error_id")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        let message = inner
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(ApiError::Rejected { error_id, message });
    }
    Ok(inner)
}

/// Decode the body and return `response.<key>`.
pub fn parse_entity(response: &HttpResponse, key: &str) -> Result<Value> {
    let mut inner = parse_envelope(response)?;
    inner
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| ApiError::missing(format!("response.{key}")))
}

/// Borrow `value[key]`, reporting `path` when it is absent or null.
pub(crate) fn field<'a>(value: &'a Value, key: &str, path: &str) -> Result<&'a Value> {
    match value.get(key) {
        Some(Value::Null) | None => Err(ApiError::missing(path)),
        Some(v) => Ok(v),
    }
}

/// `value[key]` as a string.
pub(crate) fn str_field<'a>(value: &'a Value, key: &str, path: &str) -> Result<&'a str> {
    field(value, key, path)?
        .as_str()
        .ok_or_else(|| ApiError::missing(path))
}

/// `value[key]` as an unsigned integer.
pub(crate) fn u64_field(value: &Value, key: &str, path: &str) -> Result<u64> {
    let v = field(value, key, path)?;
    v.as_u64()
        .ok_or_else(|| ApiError::Deserialization(format!("{path} is not an unsigned integer: {v}")))
}
