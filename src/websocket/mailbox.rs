//! Per-observer delivery queue
//!
//! Every pushed message is a full snapshot, so a queued message is stale as
//! soon as a newer one of the same kind arrives. The mailbox keeps at most
//! one pending message per kind: a new message replaces the pending one of
//! its kind and moves to the back. A client that stops reading therefore
//! holds at most one message per kind, and the messages it does receive are
//! in the order they were produced.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use super::hub::Payload;

/// Create a connected sender/receiver pair
pub fn channel() -> (ObserverSender, ObserverReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            pending: VecDeque::new(),
            sender_alive: true,
            receiver_alive: true,
        }),
        notify: Notify::new(),
    });

    (
        ObserverSender {
            shared: Arc::clone(&shared),
        },
        ObserverReceiver { shared },
    )
}

struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        // The critical sections cannot panic halfway, so a poisoned lock
        // still holds a consistent queue
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct State {
    pending: VecDeque<(&'static str, Payload)>,
    sender_alive: bool,
    receiver_alive: bool,
}

/// The receiving side is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

/// Producer half, held by the hub
pub struct ObserverSender {
    shared: Arc<Shared>,
}

impl ObserverSender {
    /// Queue `payload`, replacing any pending message of the same kind
    ///
    /// Returns whether an older message was superseded.
    pub fn send(&self, kind: &'static str, payload: Payload) -> Result<bool, Closed> {
        let superseded = {
            let mut state = self.shared.state();
            if !state.receiver_alive {
                return Err(Closed);
            }
            let stale = state.pending.iter().position(|(k, _)| *k == kind);
            if let Some(index) = stale {
                state.pending.remove(index);
            }
            state.pending.push_back((kind, payload));
            stale.is_some()
        };
        self.shared.notify.notify_one();
        Ok(superseded)
    }

    /// Whether the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        !self.shared.state().receiver_alive
    }
}

impl Drop for ObserverSender {
    fn drop(&mut self) {
        self.shared.state().sender_alive = false;
        self.shared.notify.notify_one();
    }
}

/// Consumer half, drained by the socket writer task
pub struct ObserverReceiver {
    shared: Arc<Shared>,
}

impl ObserverReceiver {
    /// Wait for the next message
    ///
    /// Returns `None` once the sender is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Payload> {
        loop {
            {
                let mut state = self.shared.state();
                if let Some((_, payload)) = state.pending.pop_front() {
                    return Some(payload);
                }
                if !state.sender_alive {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Take the next message if one is queued
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.shared.state().pending.pop_front().map(|(_, payload)| payload)
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.shared.state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ObserverReceiver {
    fn drop(&mut self) {
        let mut state = self.shared.state();
        state.receiver_alive = false;
        state.pending.clear();
    }
}
