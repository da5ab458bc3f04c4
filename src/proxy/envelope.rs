use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value};

pub const CACHE_CONTROL_NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Stamp the cache-suppression triplet onto a response.
pub fn apply_no_store(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

/// Decode an upstream body without ever failing.
///
/// Empty bodies become `{}`; anything that is not JSON is wrapped as
/// `{ "message": <text> }`.
pub fn decode_body(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Value::Object(Map::new());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(_) => json!({ "message": text }),
    }
}

/// The error text an upstream put in its body, if any.
pub fn upstream_error_message(body: &Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// JSON response with no-store headers and an optional `Retry-After`.
pub fn json_response(status: StatusCode, body: Value, retry_after: Option<HeaderValue>) -> Response {
    let mut response = (status, Json(body)).into_response();
    finish_headers(response.headers_mut(), retry_after);
    response
}

/// Body-less response carrying only the envelope headers.
pub fn empty_response(status: StatusCode, retry_after: Option<HeaderValue>) -> Response {
    let mut response = status.into_response();
    finish_headers(response.headers_mut(), retry_after);
    response
}

fn finish_headers(headers: &mut HeaderMap, retry_after: Option<HeaderValue>) {
    apply_no_store(headers);
    if let Some(value) = retry_after {
        headers.insert(header::RETRY_AFTER, value);
    }
}
