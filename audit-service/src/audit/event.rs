//! Audit event types
//!
//! Inbound events as accepted by `POST /audit`. Instances are built once per
//! request by the ingress validator and are never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated audit event
///
/// `event_type` is guaranteed non-blank; the validator rejects anything else.
/// Unknown JSON fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Kind of event (e.g. `QUERY`, `LOGIN`)
    pub event_type: String,
    /// What was done (e.g. `execute`)
    #[serde(default)]
    pub action: Option<String>,
    /// Client that produced the event (e.g. `web`)
    #[serde(default)]
    pub client_type: Option<String>,
    /// HTTP request the event describes
    #[serde(default)]
    pub request: Option<RequestInfo>,
    /// Free-form metadata, passed through unflattened
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    /// Error details, passed through unflattened
    #[serde(default)]
    pub error: Option<Map<String, Value>>,
}

impl AuditEvent {
    /// Create an event with only an event type
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Self::default()
        }
    }

    /// Set the action
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set the client type
    pub fn with_client_type(mut self, client_type: impl Into<String>) -> Self {
        self.client_type = Some(client_type.into());
        self
    }

    /// Set the request details
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the metadata map
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the error map
    pub fn with_error(mut self, error: Map<String, Value>) -> Self {
        self.error = Some(error);
        self
    }
}

/// Details of the HTTP request an event describes
///
/// Every field is optional; absent fields are omitted from the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestInfo {
    pub request_id: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub query_string: Option<String>,
    pub src_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<i32>,
    pub http_user_agent: Option<String>,
    pub http_content_type: Option<String>,
    pub status: Option<i32>,
    pub bytes: Option<i64>,
    /// Request duration, in whatever unit the producer reports
    pub duration: Option<i64>,
    pub referrer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = AuditEvent::new("QUERY")
            .with_action("execute")
            .with_client_type("web");

        assert_eq!(event.event_type, "QUERY");
        assert_eq!(event.action.as_deref(), Some("execute"));
        assert_eq!(event.client_type.as_deref(), Some("web"));
        assert!(event.request.is_none());
        assert!(event.metadata.is_none());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let event: AuditEvent = serde_json::from_value(json!({
            "event_type": "TEST",
            "unknown_field": "value",
            "request": { "method": "GET", "extra": true }
        }))
        .unwrap();

        assert_eq!(event.event_type, "TEST");
        assert_eq!(
            event.request.and_then(|r| r.method).as_deref(),
            Some("GET")
        );
    }

    #[test]
    fn test_request_numeric_fields() {
        let request: RequestInfo = serde_json::from_value(json!({
            "dest_port": 8443,
            "status": 200,
            "bytes": 5_000_000_000_i64,
            "duration": 150
        }))
        .unwrap();

        assert_eq!(request.dest_port, Some(8443));
        assert_eq!(request.status, Some(200));
        assert_eq!(request.bytes, Some(5_000_000_000));
        assert_eq!(request.duration, Some(150));
        assert!(request.url.is_none());
    }
}
