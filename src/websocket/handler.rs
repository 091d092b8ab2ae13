//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use super::mailbox;
use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::ingest::Monitor;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    upgrade(ws, state.monitor.clone())
}

/// Upgrade an accepted request into an observer session
pub(crate) fn upgrade(ws: WebSocketUpgrade, monitor: Monitor) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, monitor))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, monitor: Monitor) {
    let (mut sender, mut receiver) = socket.split();

    // Mailbox drained by the writer task; the hub pushes into it
    let (tx, mut rx) = mailbox::channel();

    // Registration queues the catch-up state ahead of any broadcast
    let observer_id = match monitor.add_observer(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket observer");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Ok(text) = error_msg.to_json() {
                let _ = sender.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let id_for_send = observer_id.clone();

    // Task to forward queued messages to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.to_string())).await.is_err() {
                tracing::debug!(
                    observer_id = %id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let monitor_for_recv = monitor.clone();
    let id_for_recv = observer_id.clone();

    // Task to receive messages from the WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&monitor_for_recv, &id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        observer_id = %id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Cleanup: deregister from the hub
    monitor.remove_observer(&observer_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(monitor: &Monitor, observer_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => {
                    if let Err(e) = monitor.send_to(observer_id, &ServerMessage::Pong).await {
                        tracing::debug!(observer_id = %observer_id, error = %e, "Pong not delivered");
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        observer_id = %observer_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    // Report but keep the session open
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    if let Err(e) = monitor.send_to(observer_id, &error_msg).await {
                        tracing::debug!(observer_id = %observer_id, error = %e, "Error reply not delivered");
                    }
                }
            }
            true
        }
        Message::Binary(data) => {
            tracing::debug!(observer_id = %observer_id, bytes = data.len(), "Ignoring binary message");
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Axum answers pings automatically
            true
        }
        Message::Close(_) => {
            tracing::debug!(observer_id = %observer_id, "Client requested close");
            false
        }
    }
}
