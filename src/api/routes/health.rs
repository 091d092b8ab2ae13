//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (frames are being ingested)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 503 once the frame source has stopped.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.monitor.source_active() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let source_ok = state.monitor.source_active();

    let (observers, frames_total, unique_identifiers) = {
        let monitor = state.monitor.lock().await;
        (
            monitor.hub().observer_count(),
            monitor.stats().total_frames(),
            monitor.stats().unique_identifiers(),
        )
    };

    Json(HealthResponse {
        status: if source_ok { "healthy" } else { "degraded" }.to_string(),
        source: if source_ok { "running" } else { "stopped" }.to_string(),
        observers,
        frames_total,
        unique_identifiers,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
