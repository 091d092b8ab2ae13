//! Application State
//!
//! Shared state accessible by all HTTP and WebSocket handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use axum::http::{header, HeaderValue};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::{SetResponseHeader, SetResponseHeaderLayer};

use crate::config::ServerConfig;
use crate::ingest::Monitor;

/// Static file service with a `Cache-Control` header on every response
pub type StaticFiles = SetResponseHeader<ServeDir, HeaderValue>;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Aggregated bus state and its observers
    pub monitor: Monitor,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Dashboard assets
    pub static_files: StaticFiles,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(monitor: Monitor, config: ServerConfig) -> Self {
        let static_files = static_files(&config);
        Self {
            monitor,
            config: Arc::new(config),
            static_files,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn static_files(config: &ServerConfig) -> StaticFiles {
    let cache_control = HeaderValue::from_str(&format!(
        "public, max-age={}",
        config.static_max_age_secs
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));

    ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            cache_control,
        ))
        .service(ServeDir::new(&config.static_dir).append_index_html_on_directories(true))
}
