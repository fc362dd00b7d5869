//! Operational diagnostics for the audit pipeline
//!
//! Failures inside claim extraction and record emission are absorbed so they
//! never reach the caller. They are reported here instead, on a channel that
//! is kept apart from the audit trail itself.

/// A degraded-path event worth telling an operator about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// The assembler was handed no event; nothing was emitted
    NullEvent,
    /// The bearer token was longer than the decode limit
    OversizedToken {
        /// Token length in characters
        length: usize,
        /// Configured limit in characters
        limit: usize,
    },
    /// The bearer token could not be decoded structurally
    TokenDecodeFailed {
        /// Why decoding failed
        reason: String,
    },
    /// A finished record could not be handed to the audit sink
    EmitFailed {
        /// Event type of the lost record
        event_type: String,
        /// Why emission failed
        reason: String,
    },
}

/// Receiver for operational diagnostics
pub trait Diagnostics: Send + Sync {
    /// Report a diagnostic event
    fn report(&self, event: DiagnosticEvent);
}

/// Reports diagnostics through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::NullEvent => {
                tracing::warn!("log_event called with no event, ignoring");
            }
            DiagnosticEvent::OversizedToken { length, limit } => {
                tracing::warn!(length, limit, "Bearer token exceeds maximum size, treating as anonymous");
            }
            DiagnosticEvent::TokenDecodeFailed { reason } => {
                tracing::warn!(%reason, "Failed to decode bearer token, treating as anonymous");
            }
            DiagnosticEvent::EmitFailed { event_type, reason } => {
                tracing::error!(%event_type, %reason, "Failed to emit audit record");
            }
        }
    }
}
