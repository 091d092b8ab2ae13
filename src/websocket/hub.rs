//! WebSocket Broadcast Hub
//!
//! Holds the set of connected observers and fans serialized snapshots out
//! to all of them. Each observer has a mailbox drained by its own socket
//! writer task, so delivery never waits on a slow client, and a client that
//! stops reading holds at most one pending message per kind.
//!
//! The hub performs no locking of its own; it lives inside
//! [`crate::ingest::Monitor`] next to the state it pushes.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::mailbox::ObserverSender;
use super::messages::ServerMessage;

/// Unique identifier for a connected observer
pub type ObserverId = String;

/// Serialized message text shared by every observer of one broadcast
pub type Payload = Arc<str>;

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent observers
    pub max_observers: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { max_observers: 1000 }
    }
}

/// Handle for sending messages to a specific observer
struct ObserverHandle {
    sender: ObserverSender,
}

impl ObserverHandle {
    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Registry of observers plus fan-out of pushed messages
pub struct BroadcastHub {
    observers: HashMap<ObserverId, ObserverHandle>,
    config: HubConfig,
}

impl BroadcastHub {
    /// Create an empty hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            observers: HashMap::new(),
            config,
        }
    }

    /// Register a new observer and deliver `catch_up` to it before anything else
    ///
    /// Returns the observer ID on success, or an error if the observer limit
    /// has been reached.
    pub fn add_observer(
        &mut self,
        sender: ObserverSender,
        catch_up: &[ServerMessage],
    ) -> Result<ObserverId, HubError> {
        if self.observers.len() >= self.config.max_observers {
            return Err(HubError::TooManyObservers(self.config.max_observers));
        }

        for message in catch_up {
            let payload = serialize(message)?;
            sender
                .send(message.kind(), payload)
                .map_err(|_| HubError::SendFailed)?;
        }

        let id = Uuid::new_v4().to_string();
        self.observers.insert(id.clone(), ObserverHandle { sender });

        tracing::info!(observer_id = %id, observers = self.observers.len(), "Observer connected");
        Ok(id)
    }

    /// Deregister an observer
    ///
    /// Removing an unknown or already removed observer is a no-op. Returns
    /// whether an observer was actually removed.
    pub fn remove_observer(&mut self, id: &str) -> bool {
        let removed = self.observers.remove(id).is_some();
        if removed {
            tracing::info!(observer_id = %id, observers = self.observers.len(), "Observer disconnected");
        }
        removed
    }

    /// Serialize `message` once and queue it for every open observer
    ///
    /// Closed observers are skipped; they are removed by their own disconnect
    /// handling. Returns the number of observers the message was queued for.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        if self.observers.is_empty() {
            return 0;
        }

        let payload = match serialize(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast message");
                return 0;
            }
        };

        let mut sent_count = 0;
        for (id, handle) in &self.observers {
            if !handle.is_open() {
                tracing::trace!(observer_id = %id, "Skipping closed observer");
                continue;
            }
            if handle.sender.send(message.kind(), Arc::clone(&payload)).is_ok() {
                sent_count += 1;
            }
        }

        tracing::trace!(observers = sent_count, "Broadcast message");
        sent_count
    }

    /// Send a message directly to a specific observer
    pub fn send_to(&self, id: &str, message: &ServerMessage) -> Result<(), HubError> {
        let handle = self.observers.get(id).ok_or(HubError::ObserverNotFound)?;
        let payload = serialize(message)?;

        handle
            .sender
            .send(message.kind(), payload)
            .map(|_| ())
            .map_err(|_| HubError::SendFailed)
    }

    /// Get the current observer count
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Whether an observer is currently registered
    pub fn contains(&self, id: &str) -> bool {
        self.observers.contains_key(id)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

fn serialize(message: &ServerMessage) -> Result<Payload, HubError> {
    Ok(Arc::from(message.to_json()?))
}

/// Errors that can occur in the broadcast hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many observers (limit: {0})")]
    TooManyObservers(usize),

    #[error("Observer not found")]
    ObserverNotFound,

    #[error("Failed to send message")]
    SendFailed,

    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}
