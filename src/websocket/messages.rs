//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! clients (dashboards) and the canscope server.

use serde::{Deserialize, Serialize};

use crate::telemetry::{LogEntry, StatsSnapshot};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
///
/// Every state message carries the full current state, never a delta.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Frame count per identifier
    DetailedStats {
        stats: StatsSnapshot,
    },
    /// Recent frames inside the filter range, oldest first
    FilteredLogUpdate {
        log: Vec<LogEntry>,
    },
    /// Number of distinct identifiers seen so far
    UniqueIdCount {
        count: usize,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Serialize to the JSON text pushed over the socket
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Value of the `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DetailedStats { .. } => "detailedStats",
            Self::FilteredLogUpdate { .. } => "filteredLogUpdate",
            Self::UniqueIdCount { .. } => "uniqueIdCount",
            Self::Pong => "pong",
            Self::Error { .. } => "error",
        }
    }
}
