//! Per-zone accumulated statistics.

use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::zone::ZoneIndex;

/// Accumulated statistics for one zone across the session.
///
/// `exclusive_ticks` uses wrapping arithmetic: a parent's exclusive total is
/// decremented when each child closes and only becomes meaningful once the
/// parent itself has closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ZoneEntry {
    /// Label from the most recent invocation.
    pub name: &'static str,
    /// Ticks including nested zones, summed over invocations.
    pub inclusive_ticks: u64,
    /// Ticks excluding nested zones, summed over invocations.
    pub exclusive_ticks: u64,
    /// Number of completed invocations.
    pub hit_count: u64,
    /// Caller-declared bytes, summed over invocations.
    pub bytes_processed: u64,
    /// Page faults during the most recent invocation.
    pub page_fault_count: u64,
    /// Smallest single-invocation inclusive ticks.
    pub inclusive_ticks_min: u64,
    /// Largest single-invocation inclusive ticks.
    pub inclusive_ticks_max: u64,
}

impl ZoneEntry {
    /// Whether the zone has accumulated any time.
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        self.inclusive_ticks != 0
    }

    /// Fold one invocation's elapsed ticks into min/max.
    ///
    /// Expects `hit_count` to already include this invocation.
    pub fn record_extremes(&mut self, elapsed: u64) {
        if self.hit_count <= 1 {
            self.inclusive_ticks_min = elapsed;
            self.inclusive_ticks_max = elapsed;
        } else {
            self.inclusive_ticks_min = self.inclusive_ticks_min.min(elapsed);
            self.inclusive_ticks_max = self.inclusive_ticks_max.max(elapsed);
        }
    }
}

/// Fixed-capacity table of zone entries. Slot 0 is the root.
#[derive(Debug)]
pub(crate) struct EntryTable {
    entries: Box<[ZoneEntry]>,
}

impl EntryTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![ZoneEntry::default(); capacity].into_boxed_slice(),
        }
    }

    pub fn reset(&mut self) {
        self.entries.fill(ZoneEntry::default());
    }

    pub fn get(&self, index: ZoneIndex) -> Option<&ZoneEntry> {
        self.entries.get(index.as_usize())
    }

    /// Non-root entries that have been hit at least once, in index order.
    pub fn recorded(&self) -> impl Iterator<Item = (ZoneIndex, &ZoneEntry)> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, entry)| entry.hit_count > 0)
            .filter_map(|(raw, entry)| Some((ZoneIndex::new(u32::try_from(raw).ok()?), entry)))
    }
}

impl Index<ZoneIndex> for EntryTable {
    type Output = ZoneEntry;

    fn index(&self, index: ZoneIndex) -> &ZoneEntry {
        &self.entries[index.as_usize()]
    }
}

impl IndexMut<ZoneIndex> for EntryTable {
    fn index_mut(&mut self, index: ZoneIndex) -> &mut ZoneEntry {
        &mut self.entries[index.as_usize()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_track_min_and_max() {
        let mut entry = ZoneEntry::default();
        for elapsed in [50, 10, 30] {
            entry.hit_count += 1;
            entry.record_extremes(elapsed);
        }
        assert_eq!(entry.inclusive_ticks_min, 10);
        assert_eq!(entry.inclusive_ticks_max, 50);
    }

    #[test]
    fn first_hit_sets_both_extremes() {
        let mut entry = ZoneEntry {
            hit_count: 1,
            ..ZoneEntry::default()
        };
        entry.record_extremes(7);
        assert_eq!(entry.inclusive_ticks_min, 7);
        assert_eq!(entry.inclusive_ticks_max, 7);
    }

    #[test]
    fn recorded_skips_root_and_untouched() {
        let mut table = EntryTable::new(8);
        table[ZoneIndex::ROOT].hit_count = 5;
        table[ZoneIndex::new(3)].hit_count = 1;
        table[ZoneIndex::new(5)].hit_count = 2;

        let indices: Vec<u32> = table.recorded().map(|(index, _)| index.get()).collect();
        assert_eq!(indices, vec![3, 5]);
    }

    #[test]
    fn reset_clears_entries() {
        let mut table = EntryTable::new(4);
        table[ZoneIndex::new(1)].inclusive_ticks = 100;
        table.reset();
        assert!(!table.get(ZoneIndex::new(1)).unwrap().is_recorded());
    }
}
