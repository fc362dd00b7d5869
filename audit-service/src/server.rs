//! HTTP server with graceful shutdown

use axum::{
    response::{IntoResponse, Response},
    Router,
};
use http::{header, HeaderName, HeaderValue, Method, StatusCode};
use std::{any::Any, net::SocketAddr};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as CorsAny, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::{Config, ServiceConfig},
    error::{Error, Result},
    middleware::{sensitive_headers_layer, API_KEY_HEADER, REQUEST_ID_HEADER},
    routes,
    state::AppState,
};

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server until a shutdown signal arrives
    ///
    /// Readiness flips on once the listener is bound and off as soon as
    /// shutdown begins. After in-flight requests drain, the audit sink is
    /// closed so buffered records reach disk before the process exits.
    pub async fn serve(self, state: AppState) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!("Starting {} on {}", env!("CARGO_PKG_NAME"), addr);

        // Log middleware configuration
        self.log_middleware_config();

        let app = with_middleware(routes::router(state.clone()), &self.config.service);

        // Create TCP listener
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);
        state.set_ready(true);

        // Serve with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(state.clone()))
            .await?;

        tracing::info!("Flushing audit sink");
        let sink = state.sink().clone();
        tokio::task::spawn_blocking(move || sink.close())
            .await
            .map_err(|e| Error::Internal(format!("audit sink shutdown failed: {e}")))?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Log middleware configuration for debugging
    fn log_middleware_config(&self) {
        let service = &self.config.service;
        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: enabled");
        tracing::info!("  - Sensitive header masking: enabled");
        tracing::info!("  - Request body limit: {} bytes", service.body_limit_bytes);
        tracing::info!("  - CORS origin: {}", service.allowed_origin);
        tracing::info!("  - Request timeout: {} seconds", service.timeout_secs);
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Wrap a router in the standard middleware stack
///
/// Layers are applied in reverse order (the last one added is innermost).
pub fn with_middleware(app: Router, config: &ServiceConfig) -> Router {
    app
        // CORS (outermost layer)
        .layer(build_cors_layer(&config.allowed_origin))
        // Request timeout
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.timeout(),
        ))
        // Request body size limit
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        // Tracing (always enabled)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        // Mask credentials before the trace layer sees them
        .layer(sensitive_headers_layer())
        // Panic recovery (innermost layer)
        .layer(CatchPanicLayer::custom(panic_response))
}

/// Render a handler panic as the standard JSON error body
fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    Error::Internal("handler panicked".to_string()).into_response()
}

/// Build CORS layer for the configured origin
///
/// `*` allows any origin. Anything else must match exactly, and other
/// origins get no `access-control-allow-origin` header.
fn build_cors_layer(allowed_origin: &str) -> CorsLayer {
    let allow_origin = match allowed_origin.trim() {
        "*" => AllowOrigin::from(CorsAny),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::list([value]),
            Err(_) => {
                tracing::warn!("Invalid CORS origin: {}, denying cross-origin requests", origin);
                return CorsLayer::new();
            }
        },
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then mark the service unready
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    state.set_ready(false);
    tracing::info!("Shutdown signal received, draining requests...");
}
