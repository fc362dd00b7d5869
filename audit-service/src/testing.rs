//! Shared helpers for unit tests

use std::sync::Mutex;

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;

use crate::audit::diagnostics::{DiagnosticEvent, Diagnostics};

/// Mint an HS256 token carrying the given claims
///
/// The signature is real but never checked by the service.
pub(crate) fn mint_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

/// Collects reported diagnostics for assertions
#[derive(Default)]
pub(crate) struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub(crate) fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, event: DiagnosticEvent) {
        self.events.lock().unwrap().push(event);
    }
}
