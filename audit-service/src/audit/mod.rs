//! Audit event ingestion and record assembly
//!
//! # Pipeline
//!
//! ```text
//! body + Authorization + X-Request-Id
//!   -> validator   (bounds-checked AuditEvent, or 400)
//!   -> assembler   (claims + platform + request fields -> FieldRecord)
//!   -> sink        (JSON line, buffered and written off the request path)
//! ```
//!
//! Claim extraction and emission never fail outward. Degraded paths are
//! reported on the [`Diagnostics`] channel, which is separate from the audit
//! trail itself.

pub mod assembler;
pub mod claims;
pub mod config;
pub mod diagnostics;
pub mod event;
pub mod handler;
pub mod record;
pub mod sink;
pub mod validator;

pub use assembler::{EmitOutcome, FieldAssembler, PlatformFields};
pub use claims::{
    ClaimExtractor, ClaimMapping, ClaimMappingEntry, ClaimMappingError, ClaimValue,
    ExtractedClaims, MAX_TOKEN_CHARS,
};
pub use config::{AuditSinkConfig, RotationPolicy, SinkKind};
pub use diagnostics::{DiagnosticEvent, Diagnostics, TracingDiagnostics};
pub use event::{AuditEvent, RequestInfo};
pub use record::{truncate, FieldRecord, MAX_FIELD_CHARS};
pub use sink::{open_sink, AuditSink, MemoryAuditSink, QueuedAuditSink, SinkError};
pub use validator::{parse_event, IngressLimits, ValidationError};
