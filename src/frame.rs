//! Bus Frame Types
//!
//! A [`FrameEvent`] is one frame as delivered by a frame source. It is owned
//! by the ingestion loop only for the duration of the update it triggers.

use std::fmt;

/// Number of payload bytes used for the derived key of a log entry
pub const DERIVED_KEY_BYTES: usize = 4;

/// A single frame received from the bus
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvent {
    /// Numeric identifier (11-bit standard or 29-bit extended)
    pub identifier: u32,
    /// Payload bytes (at most 8 for classic CAN)
    pub payload: Vec<u8>,
    /// Data length code as reported by the driver
    pub length: usize,
    /// Receive time in seconds since the Unix epoch
    pub timestamp_secs: f64,
    /// Extended (29-bit) identifier flag
    pub extended: bool,
    /// Remote transmission request flag
    pub remote: bool,
}

impl FrameEvent {
    /// Create a standard data frame stamped with the current time
    pub fn new(identifier: u32, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        Self {
            identifier,
            length: payload.len(),
            payload,
            timestamp_secs: now_secs(),
            extended: false,
            remote: false,
        }
    }

    /// Set an explicit receive timestamp
    pub fn at(mut self, timestamp_secs: f64) -> Self {
        self.timestamp_secs = timestamp_secs;
        self
    }

    /// Full payload as upper-case hex
    pub fn payload_hex(&self) -> String {
        hex::encode_upper(&self.payload)
    }

    /// First four payload bytes as upper-case hex; shorter payloads are not padded
    pub fn derived_key_hex(&self) -> String {
        let end = self.payload.len().min(DERIVED_KEY_BYTES);
        hex::encode_upper(&self.payload[..end])
    }
}

/// Current wall-clock time in fractional seconds
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Display adapter rendering an identifier as `0x` + zero-padded upper-case hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdHex(pub u32);

impl fmt::Display for IdHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:03X}", self.0)
    }
}

impl serde::Serialize for IdHex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse an identifier written as hex with a `0x` prefix or as a decimal number
pub fn parse_identifier(text: &str) -> Option<u32> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => u32::from_str_radix(digits, 16).ok(),
        None => text.parse().ok(),
    }
}
