//! Snapshot Route
//!
//! - GET /api/v1/snapshot - Current counters and filtered log

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::SnapshotResponse;
use crate::api::state::AppState;

/// GET /api/v1/snapshot
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<SnapshotResponse> {
    let monitor = state.monitor.lock().await;

    Json(SnapshotResponse {
        stats: monitor.stats_snapshot(),
        log: monitor.log().map(|log| log.snapshot()),
        unique_identifiers: monitor.stats().unique_identifiers(),
        frames_total: monitor.stats().total_frames(),
    })
}
