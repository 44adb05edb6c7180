//! Zone identity and open-zone handles.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::tracking::Tracking;

/// Process-wide zone index counter. 0 is never handed out.
static NEXT_ZONE_INDEX: AtomicU32 = AtomicU32::new(0);

/// Index of a zone's entry in the entry table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ZoneIndex(u32);

impl ZoneIndex {
    /// The implicit parent of top-level zones. Never reported.
    pub const ROOT: Self = Self(0);

    /// Wrap a raw index.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Index as a table offset.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

/// Hand out the next zone index, or report that the table for `C` is full.
pub fn try_next_zone_index<C: Tracking>() -> Result<ZoneIndex> {
    let raw = NEXT_ZONE_INDEX
        .fetch_add(1, Ordering::Relaxed)
        .wrapping_add(1);
    check_capacity(raw, C::CAPACITY)
}

/// Hand out the next zone index.
///
/// # Panics
///
/// Panics when the entry table for `C` is full. Capacity is a build-time
/// setting; running out of it is not recoverable.
#[must_use]
pub fn next_zone_index<C: Tracking>() -> ZoneIndex {
    match try_next_zone_index::<C>() {
        Ok(index) => index,
        Err(err) => capacity_exceeded(err),
    }
}

fn check_capacity(raw: u32, capacity: usize) -> Result<ZoneIndex> {
    if raw == 0 || raw == REGISTERING || raw as usize >= capacity {
        return Err(Error::CapacityExceeded {
            index: raw,
            capacity,
        });
    }
    Ok(ZoneIndex(raw))
}

/// Check an index assigned earlier against the table for `C`.
fn checked_index<C: Tracking>(raw: u32) -> ZoneIndex {
    match check_capacity(raw, C::CAPACITY) {
        Ok(index) => index,
        Err(err) => capacity_exceeded(err),
    }
}

#[cold]
fn capacity_exceeded(err: Error) -> ! {
    tracing::error!("{err}");
    panic!("{err}");
}

/// Slot value while one thread draws the call site's index.
const REGISTERING: u32 = u32::MAX;

/// Memoized zone index for one call site.
///
/// Meant to live in a `static`; the first call to [`ZoneSlot::index`] assigns
/// an index and every later call returns it. Concurrent first touches agree on
/// a single index.
#[derive(Debug, Default)]
pub struct ZoneSlot {
    index: AtomicU32,
}

impl ZoneSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            index: AtomicU32::new(0),
        }
    }

    /// The call site's index, assigned on first use.
    ///
    /// Returns [`ZoneIndex::ROOT`] without registering when `C` is disabled.
    ///
    /// # Panics
    ///
    /// Panics when the index does not fit the entry table for `C`, including
    /// an index assigned earlier under a larger capacity.
    #[inline]
    pub fn index<C: Tracking>(&self) -> ZoneIndex {
        if !C::ENABLED {
            return ZoneIndex::ROOT;
        }
        match self.index.load(Ordering::Acquire) {
            0 => self.register::<C>(),
            REGISTERING => self.wait_for_registration::<C>(),
            raw => checked_index::<C>(raw),
        }
    }

    #[cold]
    fn register<C: Tracking>(&self) -> ZoneIndex {
        match self
            .index
            .compare_exchange(0, REGISTERING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => match try_next_zone_index::<C>() {
                Ok(fresh) => {
                    self.index.store(fresh.0, Ordering::Release);
                    tracing::debug!(index = fresh.0, "Registered profiling zone");
                    fresh
                }
                Err(err) => {
                    self.index.store(0, Ordering::Release);
                    capacity_exceeded(err)
                }
            },
            // Another thread is drawing or already drew the index.
            Err(REGISTERING) => self.wait_for_registration::<C>(),
            Err(winner) => checked_index::<C>(winner),
        }
    }

    #[cold]
    fn wait_for_registration<C: Tracking>(&self) -> ZoneIndex {
        loop {
            match self.index.load(Ordering::Acquire) {
                REGISTERING => std::hint::spin_loop(),
                0 => return self.register::<C>(),
                raw => return checked_index::<C>(raw),
            }
        }
    }
}

/// One open zone invocation, returned by
/// [`Profiler::begin_zone`](crate::Profiler::begin_zone) and consumed by
/// [`Profiler::end_zone`](crate::Profiler::end_zone).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an open zone must be passed to `end_zone`"]
pub struct ActiveZone {
    pub(crate) name: &'static str,
    pub(crate) entry_index: ZoneIndex,
    /// Zone that was current when this one opened.
    pub(crate) parent_index: ZoneIndex,
    pub(crate) start_ticks: u64,
    /// The entry's inclusive total before this invocation.
    pub(crate) inclusive_ticks_snapshot: u64,
    pub(crate) start_page_faults: u64,
    pub(crate) byte_count: u64,
}

impl ActiveZone {
    /// The zone handed out by a disabled profiler. Ending it does nothing.
    pub const NULL: Self = Self {
        name: "",
        entry_index: ZoneIndex::ROOT,
        parent_index: ZoneIndex::ROOT,
        start_ticks: 0,
        inclusive_ticks_snapshot: 0,
        start_page_faults: 0,
        byte_count: 0,
    };

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn entry_index(&self) -> ZoneIndex {
        self.entry_index
    }

    #[must_use]
    pub const fn parent_index(&self) -> ZoneIndex {
        self.parent_index
    }

    #[must_use]
    pub const fn start_ticks(&self) -> u64 {
        self.start_ticks
    }

    #[must_use]
    pub const fn byte_count(&self) -> u64 {
        self.byte_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{Disabled, Full};

    #[test]
    fn indices_are_nonzero_and_distinct() {
        let a = next_zone_index::<Full>();
        let b = next_zone_index::<Full>();
        assert!(!a.is_root());
        assert!(!b.is_root());
        assert_ne!(a, b);
    }

    #[test]
    fn capacity_is_checked() {
        assert!(check_capacity(1, 2).is_ok());
        assert!(matches!(
            check_capacity(2, 2),
            Err(Error::CapacityExceeded {
                index: 2,
                capacity: 2
            })
        ));
        assert!(check_capacity(0, 1024).is_err());
    }

    #[test]
    fn slot_registers_once() {
        static SLOT: ZoneSlot = ZoneSlot::new();

        let first = SLOT.index::<Full>();
        let second = SLOT.index::<Full>();
        assert_eq!(first, second);
        assert!(!first.is_root());
    }

    #[test]
    fn slot_agrees_under_concurrent_first_touch() {
        static SLOT: ZoneSlot = ZoneSlot::new();

        let indices: Vec<ZoneIndex> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| SLOT.index::<Full>()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert!(indices.iter().all(|&index| index == indices[0]));
    }

    struct Tiny;

    impl Tracking for Tiny {
        const CAPACITY: usize = 1;
    }

    struct Small;

    impl Tracking for Small {
        const CAPACITY: usize = 64;
    }

    #[test]
    #[should_panic(expected = "capacity exceeded")]
    fn next_index_panics_when_table_is_full() {
        // Only the root fits in a table of one.
        let _ = next_zone_index::<Tiny>();
    }

    #[test]
    fn try_next_index_reports_full_table() {
        assert!(matches!(
            try_next_zone_index::<Tiny>(),
            Err(Error::CapacityExceeded { capacity: 1, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "does not fit in 64 entries")]
    fn memoized_index_is_checked_against_smaller_table() {
        let slot = ZoneSlot {
            index: AtomicU32::new(251),
        };
        let _ = slot.index::<Small>();
    }

    #[test]
    fn memoized_index_within_capacity_is_reused() {
        let slot = ZoneSlot {
            index: AtomicU32::new(7),
        };
        assert_eq!(slot.index::<Small>(), ZoneIndex::new(7));
        assert_eq!(slot.index::<Full>(), ZoneIndex::new(7));
    }

    #[test]
    fn slot_waits_for_registering_thread() {
        let slot = ZoneSlot {
            index: AtomicU32::new(REGISTERING),
        };

        let index = std::thread::scope(|scope| {
            let waiter = scope.spawn(|| slot.index::<Full>());
            std::thread::sleep(std::time::Duration::from_millis(10));
            slot.index.store(42, Ordering::Release);
            waiter.join().unwrap()
        });

        assert_eq!(index, ZoneIndex::new(42));
    }

    #[test]
    fn failed_registration_leaves_slot_empty() {
        let slot = ZoneSlot::new();
        let result = std::panic::catch_unwind(|| slot.index::<Tiny>());
        assert!(result.is_err());
        assert_eq!(slot.index.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn disabled_slot_stays_unregistered() {
        let slot = ZoneSlot::new();
        assert_eq!(slot.index::<Disabled>(), ZoneIndex::ROOT);
        assert_eq!(slot.index.load(Ordering::Relaxed), 0);
    }
}
