//! Root Route
//!
//! Dashboards open their WebSocket on the page's own origin (`ws://host/`),
//! so `/` upgrades WebSocket requests and serves `index.html` otherwise.

use axum::{
    extract::{ws::WebSocketUpgrade, Request, State},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::util::ServiceExt;

use crate::api::state::AppState;
use crate::websocket;

/// GET /
pub async fn index_or_upgrade(
    ws: Option<WebSocketUpgrade>,
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Response {
    match ws {
        Some(ws) => websocket::upgrade(ws, state.monitor.clone()),
        None => match state.static_files.clone().oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        },
    }
}
