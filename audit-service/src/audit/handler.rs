//! `POST /audit` ingest handler

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::middleware::REQUEST_ID_HEADER;
use crate::state::AppState;

/// Body returned for every accepted event
#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub status: String,
}

/// Validate an event and hand it to the field assembler
///
/// Validation failures are 400s. Once an event is valid the response is
/// always 202, whether or not the record reached the sink.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    let event = state.limits().parse_event(&body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected audit event");
        Error::from(e)
    })?;

    let outcome = state.assembler().log_event(
        Some(&event),
        header_str(&headers, AUTHORIZATION.as_str()),
        header_str(&headers, REQUEST_ID_HEADER),
    );
    tracing::debug!(event_type = %event.event_type, ?outcome, "Audit event accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted".to_string(),
        }),
    ))
}

// Non-UTF-8 header values are treated as absent.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
