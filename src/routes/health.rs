//! Liveness endpoint for container orchestration.
//!
//! Returns 200 OK whenever the process can answer HTTP. It never touches the
//! backing services; use `GET /` for the dependency report.

/// Health check handler.
pub async fn health() -> &'static str {
    "ok"
}
