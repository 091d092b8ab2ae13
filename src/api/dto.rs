//! Response bodies for the HTTP endpoints

use serde::Serialize;

use crate::telemetry::{LogEntry, StatsSnapshot};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded
    pub status: String,
    /// Frame source status: running, stopped
    pub source: String,
    /// Connected WebSocket clients
    pub observers: usize,
    /// Frames ingested since start
    pub frames_total: u64,
    /// Distinct identifiers seen since start
    pub unique_identifiers: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

/// Current aggregated state, in the same shapes as the pushed messages
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub stats: StatsSnapshot,
    /// `None` when the filtered log is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<LogEntry>>,
    pub unique_identifiers: usize,
    pub frames_total: u64,
}
