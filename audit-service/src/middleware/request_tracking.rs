//! Request tracking middleware
//!
//! Marks credential-bearing headers as sensitive so the trace layer never
//! prints them. The `X-Request-Id` header is left untouched: when an event
//! body carries no request id, the caller's header value is what ends up in
//! the audit record, so no id is generated here.

use axum::http::HeaderName;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;

/// Header whose value becomes the record's `request_id` fallback
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sensitive headers that should be masked in logs
pub const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key"];

/// Create a sensitive headers layer
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    let headers = SENSITIVE_HEADERS
        .iter()
        .copied()
        .map(HeaderName::from_static)
        .collect::<Vec<_>>();

    SetSensitiveRequestHeadersLayer::new(headers)
}
