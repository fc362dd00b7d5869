//! # audit-service
//!
//! HTTP ingestion service for structured audit events. Each accepted event is
//! enriched with identity claims decoded from the caller's bearer token and
//! with static platform fields, flattened into one ordered record, and written
//! as a JSON line to the audit sink.
//!
//! ## Features
//!
//! - **Claim extraction**: structural (unverified) bearer token decoding under
//!   a configurable claim → field mapping
//! - **Bounded records**: every string field capped at 2000 characters
//! - **Ingress validation**: nesting depth, string size and key-count limits
//! - **Non-blocking sink**: bounded queue feeding a rolling-file writer thread
//! - **Graceful shutdown**: readiness flips off, requests drain, the sink flushes
//!
//! ## Example
//!
//! ```rust,no_run
//! use audit_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     let _log_guard = init_tracing(&config)?;
//!
//!     // Open the audit sink and build application state
//!     let sink = open_sink(&config.audit).map_err(|e| Error::Internal(e.to_string()))?;
//!     let state = AppState::new(config.clone(), sink);
//!
//!     // Run server
//!     Server::new(config).serve(state).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::{
        open_sink, AuditEvent, AuditSink, ClaimExtractor, ClaimMapping, ClaimValue, Diagnostics,
        EmitOutcome, FieldAssembler, FieldRecord, IngressLimits, MemoryAuditSink, PlatformFields,
        RequestInfo, TracingDiagnostics,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::health::health;
    pub use crate::middleware::{sensitive_headers_layer, ApiKeyAuth};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::routes::router;
    pub use crate::server::Server;
    pub use crate::state::AppState;
}
