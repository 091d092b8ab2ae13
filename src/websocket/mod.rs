//! WebSocket Live Push
//!
//! Pushes aggregated bus state to dashboard clients via WebSocket.
//!
//! ## Architecture
//!
//! - **BroadcastHub**: Holds connected observers and fans messages out to them
//! - **Mailbox**: Per-observer queue keeping the newest message of each kind
//! - **Handler**: Handles WebSocket upgrade and per-connection tasks
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/` (or `/ws`). No subscription is needed: on join the
//! client receives the full current state, then a fresh full snapshot after
//! every change:
//! - `detailedStats` - frame count per identifier, after every frame
//! - `filteredLogUpdate` - recent frames in the filter range, after each logged frame
//! - `uniqueIdCount` - number of distinct identifiers (when enabled)
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket(`ws://${window.location.host}`);
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'detailedStats') renderTable(msg.stats);
//! };
//! ```

mod handler;
mod hub;
pub mod mailbox;
mod messages;

pub(crate) use handler::upgrade;
pub use handler::websocket_handler;
pub use hub::{BroadcastHub, HubConfig, HubError, ObserverId, Payload};
pub use mailbox::{ObserverReceiver, ObserverSender};
pub use messages::{ClientMessage, ServerMessage};
