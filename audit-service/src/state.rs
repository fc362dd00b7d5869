//! Application state management

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audit::{
    AuditSink, ClaimExtractor, Diagnostics, FieldAssembler, IngressLimits, TracingDiagnostics,
};
use crate::config::Config;

/// Application state shared across handlers
///
/// Everything here is fixed at startup except the readiness flag.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    assembler: Arc<FieldAssembler>,
    sink: Arc<dyn AuditSink>,
    limits: IngressLimits,
    ready: Arc<AtomicBool>,
}

impl AppState {
    /// Create state that reports diagnostics through `tracing`
    pub fn new(config: Config, sink: Arc<dyn AuditSink>) -> Self {
        Self::with_diagnostics(config, sink, Arc::new(TracingDiagnostics))
    }

    /// Create state with an explicit diagnostics channel
    pub fn with_diagnostics(
        config: Config,
        sink: Arc<dyn AuditSink>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let extractor = ClaimExtractor::new(config.jwt.mapping(), diagnostics.clone());
        let assembler = FieldAssembler::new(
            extractor,
            config.platform.clone(),
            sink.clone(),
            diagnostics,
        );

        Self {
            config: Arc::new(config),
            assembler: Arc::new(assembler),
            sink,
            limits: IngressLimits::default(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn assembler(&self) -> &FieldAssembler {
        &self.assembler
    }

    /// The audit sink records are written to
    pub fn sink(&self) -> &Arc<dyn AuditSink> {
        &self.sink
    }

    pub fn limits(&self) -> &IngressLimits {
        &self.limits
    }

    /// Whether the service is accepting traffic
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;

    #[test]
    fn test_state_starts_not_ready() {
        let state = AppState::new(Config::default(), Arc::new(MemoryAuditSink::new()));
        assert!(!state.is_ready());

        let clone = state.clone();
        clone.set_ready(true);
        assert!(state.is_ready());
    }

    #[test]
    fn test_state_uses_configured_platform() {
        let mut config = Config::default();
        config.platform.app = Some("picsure".into());

        let state = AppState::new(config, Arc::new(MemoryAuditSink::new()));
        assert_eq!(state.assembler().platform().app.as_deref(), Some("picsure"));
    }
}
