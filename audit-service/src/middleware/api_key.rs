//! Shared-key authentication for ingest routes

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::Error;

/// Header carrying the shared key
pub const API_KEY_HEADER: &str = "x-api-key";

const UNAUTHORIZED_MESSAGE: &str = "Missing or invalid API key";

/// Requires `X-API-Key` to match the configured key
#[derive(Clone)]
pub struct ApiKeyAuth {
    expected: Arc<str>,
}

impl ApiKeyAuth {
    pub fn new(expected: impl Into<Arc<str>>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    /// Whether the request headers carry the expected key
    pub fn is_authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .is_some_and(|provided| constant_time_compare(&self.expected, provided))
    }

    /// Middleware function rejecting requests without a valid key
    pub async fn middleware(
        State(auth): State<Self>,
        request: Request<Body>,
        next: Next,
    ) -> Result<Response, Error> {
        if !auth.is_authorized(request.headers()) {
            tracing::warn!(
                path = %request.uri().path(),
                "Rejected request with missing or invalid API key"
            );
            return Err(Error::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()));
        }

        Ok(next.run(request).await)
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth").finish_non_exhaustive()
    }
}

/// Compare two strings without short-circuiting on the first difference
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
