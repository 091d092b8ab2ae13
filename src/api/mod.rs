//! canscope HTTP API
//!
//! HTTP layer for canscope, built with Axum.
//!
//! # Endpoints
//!
//! ## Live push
//! - `GET /` - WebSocket upgrade, or the dashboard's `index.html`
//! - `GET /ws` - WebSocket upgrade
//!
//! ## Snapshot
//! - `GET /api/v1/snapshot` - Current counters and filtered log
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## Static files
//! - anything else is served from the configured static directory
//!
//! # Example
//!
//! ```rust,ignore
//! use canscope::api::{serve, AppState};
//! use canscope::config::Config;
//! use canscope::ingest::Monitor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let monitor = Monitor::new(config.monitor_config()?);
//!     let state = AppState::new(monitor, config.server.clone());
//!     serve(state, &config.server.addr(), std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use state::AppState;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::websocket::websocket_handler;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().route("/snapshot", get(routes::snapshot::get_snapshot));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let static_files = state.static_files.clone();

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::root::index_or_upgrade))
        .route("/ws", get(websocket_handler))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .fallback_service(static_files)
        .layer(middleware::from_fn(response_time))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Stamp every response with `X-Response-Time: <n>ms`
async fn response_time(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;

    let elapsed = format!("{}ms", start.elapsed().as_millis());
    if let Ok(value) = HeaderValue::from_str(&elapsed) {
        response.headers_mut().insert("x-response-time", value);
    }
    response
}

/// Start the server
///
/// Runs until SIGINT/SIGTERM or until `stop` resolves.
pub async fn serve<F>(state: AppState, addr: &str, stop: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let static_dir = state.config.static_dir.clone();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    tracing::info!("canscope listening on http://{}", addr);
    tracing::info!("Serving static files from {:?}", static_dir);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {},
                _ = stop => {
                    tracing::warn!("Stop requested, starting graceful shutdown");
                },
            }
        })
        .await?;

    tracing::info!("canscope shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::frame::FrameEvent;
    use crate::ingest::{FilterSettings, Monitor, MonitorConfig};
    use crate::websocket::HubConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use std::num::NonZeroUsize;
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    fn create_monitor() -> Monitor {
        Monitor::new(MonitorConfig {
            filter: Some(FilterSettings {
                range: 0x700..=0x77F,
                capacity: NonZeroUsize::new(50).unwrap(),
            }),
            unique_id_count: false,
            hub: HubConfig::default(),
        })
    }

    fn create_test_app(monitor: Monitor) -> (Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>dashboard</html>").unwrap();
        std::fs::write(dir.path().join("script.js"), "console.log('hi');").unwrap();

        let config = ServerConfig {
            static_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let router = build_router(AppState::new(monitor, config));

        (router, dir)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _dir) = create_test_app(create_monitor());
        let response = get(app, "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_without_source() {
        let (app, _dir) = create_test_app(create_monitor());
        let response = get(app, "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_full() {
        let monitor = create_monitor();
        monitor.ingest(&FrameEvent::new(0x123, vec![1])).await;
        let (app, _dir) = create_test_app(monitor);

        let response = get(app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["frames_total"], 1);
        assert_eq!(body["unique_identifiers"], 1);
        assert_eq!(body["source"], "stopped");
    }

    #[tokio::test]
    async fn test_snapshot() {
        let monitor = create_monitor();
        for id in [0x100, 0x100, 0x200, 0x701] {
            monitor.ingest(&FrameEvent::new(id, vec![0x01, 0x02])).await;
        }
        let (app, _dir) = create_test_app(monitor);

        let response = get(app, "/api/v1/snapshot").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["stats"]["0x100"], 2);
        assert_eq!(body["stats"]["0x200"], 1);
        assert_eq!(body["log"][0]["id"], "0x701");
        assert_eq!(body["log"][0]["txid"], "0102");
        assert_eq!(body["frames_total"], 4);
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let (app, _dir) = create_test_app(create_monitor());
        let response = get(app, "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("cache-control").unwrap(),
            "public, max-age=86400"
        );
        assert!(response.headers().contains_key("x-response-time"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<html>dashboard</html>");
    }

    #[tokio::test]
    async fn test_static_file() {
        let (app, _dir) = create_test_app(create_monitor());
        let response = get(app, "/script.js").await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("javascript"));
    }

    #[tokio::test]
    async fn test_static_missing_file() {
        let (app, _dir) = create_test_app(create_monitor());
        let response = get(app, "/missing.css").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_rejects_traversal() {
        let (app, _dir) = create_test_app(create_monitor());
        let response = get(app, "/../Cargo.toml").await;
        assert_ne!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let (app, _dir) = create_test_app(create_monitor());
        let response = get(app, "/ws").await;
        assert!(response.status().is_client_error());
    }
}
