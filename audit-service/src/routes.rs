//! HTTP routes

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{audit::handler::ingest, health::health, middleware::ApiKeyAuth, state::AppState};

/// Build the service router
///
/// `POST /audit` requires the API key; `GET /health` is open.
pub fn router(state: AppState) -> Router {
    let auth = ApiKeyAuth::new(state.config().auth.api_key.as_str());
    let body_limit = state.config().service.body_limit_bytes;

    let ingest_routes = Router::new()
        .route("/audit", post(ingest))
        .route_layer(middleware::from_fn_with_state(auth, ApiKeyAuth::middleware));

    Router::new()
        .route("/health", get(health))
        .merge(ingest_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
