//! Middleware for ingest authentication and request tracking

pub mod api_key;
pub mod request_tracking;

pub use api_key::{ApiKeyAuth, API_KEY_HEADER};
pub use request_tracking::{sensitive_headers_layer, REQUEST_ID_HEADER, SENSITIVE_HEADERS};
