//! Dependency report endpoint.

use axum::{extract::State, Json};

use crate::checker::HealthReport;
use crate::state::AppState;

/// Probe every bound service and report the outcome of each.
///
/// Always answers 200: a failing dependency is reported in the body, not in
/// the status code.
pub async fn report(State(state): State<AppState>) -> Json<HealthReport> {
    let report = state.checker.run_all().await;

    if report.failures() > 0 {
        tracing::info!(failures = report.failures(), "Dependency report has failures");
    }

    Json(report)
}
