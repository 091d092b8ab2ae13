//! Live Telemetry Aggregation
//!
//! In-memory state derived from the frame stream:
//!
//! - **StatsAggregator**: occurrence count per identifier
//! - **FilteredLog**: bounded recent history of frames inside an identifier range
//!
//! Both are plain single-writer structures. Callers that share them across
//! tasks keep them behind one lock (see [`crate::ingest::Monitor`]).

mod filtered_log;
mod stats;

pub use filtered_log::{FilteredLog, LogEntry, DEFAULT_LOG_CAPACITY};
pub use stats::{StatsAggregator, StatsSnapshot};
