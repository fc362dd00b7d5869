//! Field assembly
//!
//! Merges a validated event, the claims carried by its bearer token, the
//! static platform fields and the flattened request details into one ordered
//! [`FieldRecord`], then hands it to the audit sink.
//!
//! [`FieldAssembler::log_event`] is the emission boundary. It returns an
//! [`EmitOutcome`] and never an error: failures are reported on the
//! diagnostics channel and the caller carries on.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::claims::{ClaimExtractor, ClaimValue};
use super::diagnostics::{DiagnosticEvent, Diagnostics};
use super::event::{AuditEvent, RequestInfo};
use super::record::{truncate, FieldRecord};
use super::sink::AuditSink;

/// Deployment fields stamped on every record
///
/// Set once at startup and shared read-only across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformFields {
    pub app: Option<String>,
    pub platform: Option<String>,
    pub environment: Option<String>,
    pub hostname: Option<String>,
}

/// What happened to an emission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// The record was handed to the sink
    Emitted,
    /// No event was supplied; nothing to do
    Ignored,
    /// The sink refused the record; the failure was reported and swallowed
    Suppressed,
}

/// Builds field records and forwards them to the audit sink
#[derive(Clone)]
pub struct FieldAssembler {
    extractor: ClaimExtractor,
    platform: PlatformFields,
    sink: Arc<dyn AuditSink>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl FieldAssembler {
    pub fn new(
        extractor: ClaimExtractor,
        platform: PlatformFields,
        sink: Arc<dyn AuditSink>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            extractor,
            platform,
            sink,
            diagnostics,
        }
    }

    /// Platform fields in use
    pub fn platform(&self) -> &PlatformFields {
        &self.platform
    }

    /// Assemble and emit the record for one event
    ///
    /// A missing event is reported and ignored. A sink failure is reported
    /// and suppressed; the caller sees the same acceptance either way.
    pub fn log_event(
        &self,
        event: Option<&AuditEvent>,
        authorization: Option<&str>,
        request_id_header: Option<&str>,
    ) -> EmitOutcome {
        let Some(event) = event else {
            self.diagnostics.report(DiagnosticEvent::NullEvent);
            return EmitOutcome::Ignored;
        };

        let record = self.assemble(event, authorization, request_id_header);
        match self.sink.emit(record) {
            Ok(()) => EmitOutcome::Emitted,
            Err(e) => {
                self.diagnostics.report(DiagnosticEvent::EmitFailed {
                    event_type: truncate(&event.event_type),
                    reason: e.to_string(),
                });
                EmitOutcome::Suppressed
            }
        }
    }

    /// Build the record for an event without emitting it
    ///
    /// Field order: `_time`, event fields, token claims, platform fields,
    /// request fields, `metadata`, `error`.
    pub fn assemble(
        &self,
        event: &AuditEvent,
        authorization: Option<&str>,
        request_id_header: Option<&str>,
    ) -> FieldRecord {
        let mut record = FieldRecord::new();

        record.insert(
            "_time",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );

        record.insert_text("event_type", &event.event_type);
        record.insert_text_opt("action", event.action.as_deref());
        record.insert_text_opt("client_type", event.client_type.as_deref());

        for (field, value) in self.extractor.extract(authorization) {
            record.insert(field, bounded_claim(value));
        }

        record.insert_text_opt("app", self.platform.app.as_deref());
        record.insert_text_opt("platform", self.platform.platform.as_deref());
        record.insert_text_opt("environment", self.platform.environment.as_deref());
        record.insert_text_opt("hostname", self.platform.hostname.as_deref());

        let body_request_id = event.request.as_ref().and_then(|r| r.request_id.as_deref());
        record.insert_text_opt("request_id", resolve_request_id(body_request_id, request_id_header));

        if let Some(request) = &event.request {
            insert_request_fields(&mut record, request);
        }

        if let Some(metadata) = event.metadata.as_ref().filter(|m| !m.is_empty()) {
            record.insert("metadata", Value::Object(metadata.clone()));
        }
        if let Some(error) = event.error.as_ref().filter(|m| !m.is_empty()) {
            record.insert("error", Value::Object(error.clone()));
        }

        record
    }
}

impl std::fmt::Debug for FieldAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAssembler")
            .field("extractor", &self.extractor)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// Body value wins when non-blank, then the header, then nothing
fn resolve_request_id<'a>(body: Option<&'a str>, header: Option<&'a str>) -> Option<&'a str> {
    let non_blank = |value: &&str| !value.trim().is_empty();
    body.filter(non_blank).or_else(|| header.filter(non_blank))
}

// `request_id` is resolved separately so the header fallback applies even
// without a request object.
fn insert_request_fields(record: &mut FieldRecord, request: &RequestInfo) {
    record.insert_text_opt("method", request.method.as_deref());
    record.insert_text_opt("url", request.url.as_deref());
    record.insert_text_opt("query_string", request.query_string.as_deref());
    record.insert_text_opt("src_ip", request.src_ip.as_deref());
    record.insert_text_opt("dest_ip", request.dest_ip.as_deref());
    record.insert_opt("dest_port", request.dest_port);
    record.insert_text_opt("http_user_agent", request.http_user_agent.as_deref());
    record.insert_text_opt("http_content_type", request.http_content_type.as_deref());
    record.insert_opt("status", request.status);
    record.insert_opt("bytes", request.bytes);
    record.insert_opt("duration", request.duration);
    record.insert_text_opt("referrer", request.referrer.as_deref());
}

fn bounded_claim(value: ClaimValue) -> Value {
    match value {
        ClaimValue::Text(text) => Value::String(truncate(&text)),
        ClaimValue::Flag(flag) => Value::Bool(flag),
        ClaimValue::List(items) => {
            Value::Array(items.iter().map(|item| Value::String(truncate(item))).collect())
        }
    }
}
