//! Bounded history of frames inside an identifier range

use serde::Serialize;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;

use crate::frame::{FrameEvent, IdHex};

/// Default number of entries kept in the log
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// One logged frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Frame identifier
    #[serde(rename = "id")]
    pub identifier: IdHex,
    /// First four payload bytes as hex
    #[serde(rename = "txid")]
    pub derived_key_hex: String,
    /// Full payload as hex
    #[serde(rename = "data")]
    pub raw_payload_hex: String,
}

impl LogEntry {
    fn from_frame(frame: &FrameEvent) -> Self {
        Self {
            identifier: IdHex(frame.identifier),
            derived_key_hex: frame.derived_key_hex(),
            raw_payload_hex: frame.payload_hex(),
        }
    }
}

/// Insertion-ordered log of the most recent frames whose identifier falls in
/// an inclusive range
///
/// Holds at most `capacity` entries; the oldest entry is evicted first.
#[derive(Debug)]
pub struct FilteredLog {
    range: RangeInclusive<u32>,
    capacity: NonZeroUsize,
    entries: VecDeque<LogEntry>,
}

impl FilteredLog {
    /// Create an empty log for identifiers in `range`
    pub fn new(range: RangeInclusive<u32>, capacity: NonZeroUsize) -> Self {
        Self {
            range,
            capacity,
            entries: VecDeque::with_capacity(capacity.get()),
        }
    }

    /// Whether `identifier` passes the range filter
    pub fn contains(&self, identifier: u32) -> bool {
        self.range.contains(&identifier)
    }

    /// Append `frame` if it passes the filter
    ///
    /// Returns `true` if the frame was logged.
    pub fn offer(&mut self, frame: &FrameEvent) -> bool {
        if !self.contains(frame.identifier) {
            return false;
        }

        self.entries.push_back(LogEntry::from_frame(frame));
        while self.entries.len() > self.capacity.get() {
            self.entries.pop_front();
        }
        true
    }

    /// Copy of the current entries, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn range(&self) -> &RangeInclusive<u32> {
        &self.range
    }
}
