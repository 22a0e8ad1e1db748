//! HTTP route handlers.
//!
//! `GET /` builds the dependency report and is never cached. `GET /health` is a
//! plain liveness probe for the process itself.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod report;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CACHE_CONTROL_REPORT;
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with all routes and cache headers.
pub fn create_router(state: AppState) -> Router {
    // Dependency report - always fresh
    let report_routes = Router::new()
        .route("/", get(report::report))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_REPORT),
        ));

    // Liveness - no caching, always fresh for orchestrator probes
    let health_routes = Router::new().route("/health", get(health::health));

    Router::new()
        .merge(report_routes)
        .merge(health_routes)
        .with_state(state)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
