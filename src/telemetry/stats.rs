//! Per-identifier frame counters

use serde::ser::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

use crate::frame::IdHex;

/// Running occurrence count for every identifier seen on the bus
///
/// Counts only ever grow, by exactly one per recorded frame, and entries are
/// never removed.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    counts: HashMap<u32, u64>,
    total: u64,
}

impl StatsAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame for `identifier`
    ///
    /// Returns `true` if this is the first frame seen for the identifier.
    pub fn record(&mut self, identifier: u32) -> bool {
        self.total += 1;
        let count = self.counts.entry(identifier).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Current count for one identifier (zero if never seen)
    pub fn count(&self, identifier: u32) -> u64 {
        self.counts.get(&identifier).copied().unwrap_or(0)
    }

    /// Number of distinct identifiers seen
    pub fn unique_identifiers(&self) -> usize {
        self.counts.len()
    }

    /// Total frames recorded across all identifiers
    pub fn total_frames(&self) -> u64 {
        self.total
    }

    /// Immutable copy of the counters, ordered by identifier
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            counts: self.counts.iter().map(|(id, count)| (*id, *count)).collect(),
        }
    }
}

/// Point-in-time copy of [`StatsAggregator`] counters
///
/// Iteration is by numeric identifier, ascending. Serializes as a JSON object
/// keyed by hex identifier strings (`{"0x100": 2, ...}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    counts: BTreeMap<u32, u64>,
}

impl StatsSnapshot {
    /// Count for one identifier, if present
    pub fn get(&self, identifier: u32) -> Option<u64> {
        self.counts.get(&identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(identifier, count)` pairs in ascending identifier order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.counts.iter().map(|(id, count)| (*id, *count))
    }
}

impl Serialize for StatsSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(id, count)| (IdHex(id), count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut stats = StatsAggregator::new();
        assert!(stats.record(0x100));
        assert!(!stats.record(0x100));
        assert!(stats.record(0x200));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.get(0x100), Some(2));
        assert_eq!(snapshot.get(0x200), Some(1));
        assert_eq!(snapshot.get(0x300), None);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(stats.total_frames(), 3);
        assert_eq!(stats.unique_identifiers(), 2);
    }

    #[test]
    fn test_record_leaves_other_counts_alone() {
        let mut stats = StatsAggregator::new();
        let ids = [0x10, 0x20, 0x10, 0x30, 0x10, 0x20];
        for id in ids {
            let before = stats.snapshot();
            stats.record(id);
            let after = stats.snapshot();

            assert_eq!(after.get(id).unwrap(), before.get(id).unwrap_or(0) + 1);
            for (other, count) in before.iter().filter(|(other, _)| *other != id) {
                assert_eq!(after.get(other), Some(count));
            }
        }

        for id in [0x10, 0x20, 0x30] {
            let expected = ids.iter().filter(|x| **x == id).count() as u64;
            assert_eq!(stats.count(id), expected);
        }
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut stats = StatsAggregator::new();
        stats.record(0x1);
        let snapshot = stats.snapshot();
        stats.record(0x1);

        assert_eq!(snapshot.get(0x1), Some(1));
        assert_eq!(stats.count(0x1), 2);
    }

    #[test]
    fn test_snapshot_numeric_order() {
        let mut stats = StatsAggregator::new();
        // "0x1000" < "0x200" as text, but not as numbers
        for id in [0x1000, 0x200, 0x0A, 0x7FF] {
            stats.record(id);
        }
        let ids: Vec<u32> = stats.snapshot().iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0x0A, 0x200, 0x7FF, 0x1000]);
    }

    #[test]
    fn test_snapshot_serialize() {
        let mut stats = StatsAggregator::new();
        stats.record(0x200);
        stats.record(0x100);
        stats.record(0x100);

        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert_eq!(json, r#"{"0x100":2,"0x200":1}"#);
    }
}
