//! SocketCAN frame source (Linux)

use socketcan::{CanFrame, CanSocket, EmbeddedFrame, Frame, Socket};
use tokio::sync::mpsc;

use super::{FrameSource, SourceError};
use crate::frame::{now_secs, FrameEvent, IdHex};

/// Raw CAN socket bound to one interface
pub struct SocketCanSource {
    interface: String,
    socket: CanSocket,
}

impl SocketCanSource {
    /// Open the raw socket
    ///
    /// Fails if the interface does not exist or is down.
    pub fn open(interface: &str) -> Result<Self, SourceError> {
        let socket = CanSocket::open(interface).map_err(|e| SourceError::Open {
            interface: interface.to_string(),
            source: e.into(),
        })?;

        tracing::info!(interface = %interface, "Opened CAN interface");
        Ok(Self {
            interface: interface.to_string(),
            socket,
        })
    }
}

impl FrameSource for SocketCanSource {
    fn name(&self) -> &str {
        &self.interface
    }

    fn run(self, frames: mpsc::Sender<FrameEvent>) -> Result<(), SourceError> {
        loop {
            let frame = self.socket.read_frame().map_err(|e| SourceError::Read {
                interface: self.interface.clone(),
                source: e,
            })?;

            let Some(event) = to_event(&frame) else {
                continue;
            };
            if frames.blocking_send(event).is_err() {
                return Ok(());
            }
        }
    }
}

fn to_event(frame: &CanFrame) -> Option<FrameEvent> {
    if let CanFrame::Error(_) = frame {
        tracing::debug!(id = %IdHex(frame.raw_id()), "Skipping error frame");
        return None;
    }

    // Remote frames carry a DLC but no data
    Some(FrameEvent {
        identifier: frame.raw_id(),
        length: frame.dlc(),
        payload: frame.data().to_vec(),
        timestamp_secs: now_secs(),
        extended: frame.is_extended(),
        remote: matches!(frame, CanFrame::Remote(_)),
    })
}
