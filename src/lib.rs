//! # canscope
//!
//! Live CAN bus telemetry. Frames from a vehicle bus are aggregated in
//! memory and pushed to browser dashboards over WebSocket.
//!
//! ## Features
//!
//! - **Frame statistics**: running count per identifier
//! - **Filtered log**: bounded history of frames inside an identifier range
//! - **Live push**: full-state snapshots to every connected client, with a
//!   catch-up snapshot on connect
//! - **Dashboard hosting**: static file serving next to the push channel
//!
//! ## Modules
//!
//! - [`telemetry`]: Aggregator and filtered log
//! - [`websocket`]: Broadcast hub and push protocol
//! - [`ingest`]: Frame ingestion loop and the shared monitor state
//! - [`source`]: Frame sources (SocketCAN)
//! - [`api`]: HTTP server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use canscope::config::Config;
//! use canscope::ingest::{Ingestor, Monitor};
//! use canscope::source::{self, SocketCanSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let monitor = Monitor::new(config.monitor_config()?);
//!
//!     // Bus frames flow through a bounded channel into one consumer
//!     let (tx, rx) = tokio::sync::mpsc::channel(config.bus.channel_capacity);
//!     source::spawn(SocketCanSource::open(&config.bus.interface)?, tx)?;
//!     let ingestion = Ingestor::new(monitor.clone(), rx).spawn();
//!
//!     let state = canscope::api::AppState::new(monitor, config.server.clone());
//!     canscope::api::serve(state, &config.server.addr(), async move {
//!         let _ = ingestion.await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod frame;
pub mod ingest;
pub mod logging;
pub mod source;
pub mod telemetry;
pub mod websocket;

// Re-export top-level types for convenience
pub use frame::{FrameEvent, IdHex};

pub use telemetry::{FilteredLog, LogEntry, StatsAggregator, StatsSnapshot};

pub use ingest::{FilterSettings, IngestOutcome, Ingestor, Monitor, MonitorConfig, MonitorState};

pub use source::{FrameSource, SocketCanSource, SourceError};

pub use api::{build_router, serve, AppState, ServerError};

pub use websocket::{
    BroadcastHub, ClientMessage, HubConfig, HubError, ServerMessage, websocket_handler,
};

pub use config::{
    BusConfig, Config, ConfigError, FilterConfig, LoggingConfig, ServerConfig, StatsConfig,
};
