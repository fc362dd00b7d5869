//! Ingress validation for `POST /audit` bodies
//!
//! Raw JSON is bounds-checked before it becomes an [`AuditEvent`]: nesting
//! depth and string length are checked on the parsed value tree, then the key
//! counts of `metadata`/`error` and the presence of `event_type`. These limits
//! are independent of the 2000-character field truncation applied later.
//!
//! Scalars are coerced leniently: a number or boolean sent for a text field
//! becomes its JSON text, and a numeric string sent for a numeric request
//! field becomes the number.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::event::{AuditEvent, RequestInfo};

/// Bounds applied to inbound events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngressLimits {
    /// Deepest allowed container nesting; the root object is depth 1
    pub max_depth: usize,
    /// Longest allowed string (value or key), in bytes
    pub max_string_bytes: usize,
    /// Most keys allowed in `metadata`
    pub max_metadata_keys: usize,
    /// Most keys allowed in `error`
    pub max_error_keys: usize,
}

impl Default for IngressLimits {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_string_bytes: 10_240,
            max_metadata_keys: 50,
            max_error_keys: 20,
        }
    }
}

/// Why an inbound body was rejected
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid JSON: nesting depth exceeds maximum of {limit}")]
    TooDeep { limit: usize },

    #[error("Invalid JSON: string length exceeds maximum of {limit} bytes")]
    StringTooLong { limit: usize },

    #[error("Invalid JSON: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("metadata must not exceed {limit} keys")]
    TooManyMetadataKeys { limit: usize },

    #[error("error must not exceed {limit} keys")]
    TooManyErrorKeys { limit: usize },

    #[error("event_type is required")]
    MissingEventType,
}

// Mirrors `AuditEvent` with `event_type` optional so its absence is
// reported as a validation failure rather than a shape error.
#[derive(Deserialize)]
struct RawAuditEvent {
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    client_type: Option<String>,
    #[serde(default)]
    request: Option<RequestInfo>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
    #[serde(default)]
    error: Option<Map<String, Value>>,
}

const EVENT_TEXT_FIELDS: [&str; 3] = ["event_type", "action", "client_type"];

const REQUEST_TEXT_FIELDS: [&str; 9] = [
    "request_id",
    "method",
    "url",
    "query_string",
    "src_ip",
    "dest_ip",
    "http_user_agent",
    "http_content_type",
    "referrer",
];

const REQUEST_NUMBER_FIELDS: [&str; 4] = ["dest_port", "status", "bytes", "duration"];

impl IngressLimits {
    /// Parse and validate a raw body into an event
    pub fn parse_event(&self, body: &[u8]) -> Result<AuditEvent, ValidationError> {
        let mut value: Value =
            serde_json::from_slice(body).map_err(ValidationError::InvalidJson)?;
        self.check_bounds(&value, 1)?;
        coerce_scalars(&mut value);

        let raw: RawAuditEvent = serde_json::from_value(value).map_err(ValidationError::Shape)?;

        if raw.metadata.as_ref().is_some_and(|m| m.len() > self.max_metadata_keys) {
            return Err(ValidationError::TooManyMetadataKeys {
                limit: self.max_metadata_keys,
            });
        }
        if raw.error.as_ref().is_some_and(|m| m.len() > self.max_error_keys) {
            return Err(ValidationError::TooManyErrorKeys {
                limit: self.max_error_keys,
            });
        }

        let event_type = raw
            .event_type
            .filter(|t| !t.trim().is_empty())
            .ok_or(ValidationError::MissingEventType)?;

        Ok(AuditEvent {
            event_type,
            action: raw.action,
            client_type: raw.client_type,
            request: raw.request,
            metadata: raw.metadata,
            error: raw.error,
        })
    }

    fn check_bounds(&self, value: &Value, depth: usize) -> Result<(), ValidationError> {
        match value {
            Value::String(s) => self.check_string(s),
            Value::Array(items) => {
                self.check_depth(depth)?;
                items
                    .iter()
                    .try_for_each(|item| self.check_bounds(item, depth + 1))
            }
            Value::Object(map) => {
                self.check_depth(depth)?;
                map.iter().try_for_each(|(key, item)| {
                    self.check_string(key)?;
                    self.check_bounds(item, depth + 1)
                })
            }
            _ => Ok(()),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), ValidationError> {
        if depth > self.max_depth {
            return Err(ValidationError::TooDeep {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn check_string(&self, s: &str) -> Result<(), ValidationError> {
        if s.len() > self.max_string_bytes {
            return Err(ValidationError::StringTooLong {
                limit: self.max_string_bytes,
            });
        }
        Ok(())
    }
}

fn coerce_scalars(value: &mut Value) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    coerce_text(root, &EVENT_TEXT_FIELDS);

    if let Some(request) = root.get_mut("request").and_then(Value::as_object_mut) {
        coerce_text(request, &REQUEST_TEXT_FIELDS);
        coerce_numbers(request, &REQUEST_NUMBER_FIELDS);
    }
}

fn coerce_text(map: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(slot) = map.get_mut(*field) {
            if matches!(slot, Value::Number(_) | Value::Bool(_)) {
                *slot = Value::String(slot.to_string());
            }
        }
    }
}

// Non-numeric strings are left alone and rejected by deserialization.
fn coerce_numbers(map: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(slot) = map.get_mut(*field) {
            let coerced = match slot.as_str() {
                Some("") => Some(Value::Null),
                Some(text) => text.parse::<i64>().ok().map(Value::from),
                None => None,
            };
            if let Some(coerced) = coerced {
                *slot = coerced;
            }
        }
    }
}

/// Validate a body under the default limits
pub fn parse_event(body: &[u8]) -> Result<AuditEvent, ValidationError> {
    IngressLimits::default().parse_event(body)
}
