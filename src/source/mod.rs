//! Frame Sources
//!
//! A frame source produces [`FrameEvent`]s from the bus. Sources read with
//! blocking calls on a dedicated thread and hand frames to the async side
//! through a bounded tokio channel, so a burst on the bus applies
//! backpressure to the reader instead of growing memory.

mod can_socket;

pub use can_socket::SocketCanSource;

use std::thread::{self, JoinHandle};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::frame::FrameEvent;

/// A blocking producer of bus frames
pub trait FrameSource: Send + 'static {
    /// Interface or source name for logs
    fn name(&self) -> &str;

    /// Read frames into `frames` until the receiver goes away or reading fails
    ///
    /// Returns `Ok(())` when the receiving side closed the channel.
    fn run(self, frames: mpsc::Sender<FrameEvent>) -> Result<(), SourceError>;
}

/// Run `source` on its own named thread
pub fn spawn<S: FrameSource>(
    source: S,
    frames: mpsc::Sender<FrameEvent>,
) -> Result<JoinHandle<Result<(), SourceError>>, SourceError> {
    let name = source.name().to_string();
    thread::Builder::new()
        .name(format!("frame-source-{}", name))
        .spawn(move || {
            let result = source.run(frames);
            match &result {
                Ok(()) => tracing::info!(source = %name, "Frame source stopped"),
                Err(e) => tracing::error!(source = %name, error = %e, "Frame source failed"),
            }
            result
        })
        .map_err(SourceError::Spawn)
}

/// Errors that can occur in a frame source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The interface could not be opened
    #[error(
        "Failed to open CAN interface {interface}: {source} \
         (check that it exists and is up; for a virtual bus: \
         sudo modprobe vcan && sudo ip link add dev vcan0 type vcan && sudo ip link set up vcan0)"
    )]
    Open {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from an open interface failed
    #[error("Failed to read from CAN interface {interface}: {source}")]
    Read {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    /// The reader thread could not be started
    #[error("Failed to start frame source thread: {0}")]
    Spawn(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of frames
    struct ListSource {
        frames: Vec<FrameEvent>,
    }

    impl FrameSource for ListSource {
        fn name(&self) -> &str {
            "list"
        }

        fn run(self, frames: mpsc::Sender<FrameEvent>) -> Result<(), SourceError> {
            for frame in self.frames {
                if frames.blocking_send(frame).is_err() {
                    return Ok(());
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_spawned_source_delivers_in_order() {
        let source = ListSource {
            frames: (0..5).map(|i| FrameEvent::new(0x700 + i, vec![i as u8])).collect(),
        };
        let (tx, mut rx) = mpsc::channel(2);
        let handle = spawn(source, tx).unwrap();

        let mut ids = Vec::new();
        while let Some(frame) = rx.recv().await {
            ids.push(frame.identifier);
        }
        assert_eq!(ids, vec![0x700, 0x701, 0x702, 0x703, 0x704]);
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_open_error_mentions_interface() {
        let err = SourceError::Open {
            interface: "can9".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such device"),
        };
        let text = err.to_string();
        assert!(text.contains("can9"));
        assert!(text.contains("vcan"));
    }
}
