//! The profiler context: entry table, session and current-zone pointer.

use std::cell::RefCell;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::time::Duration;

use crate::clock::{ClockSource, HardwareClock};
use crate::entry::{EntryTable, ZoneEntry};
use crate::error::Result;
use crate::macros::ZoneGuard;
use crate::report::Report;
use crate::session::Session;
use crate::tracking::{DefaultTracking, Tracking};
use crate::zone::{ActiveZone, ZoneIndex, ZoneSlot};

/// Calibration wait used when printing results.
pub const DEFAULT_CALIBRATION_WAIT: Duration = Duration::from_millis(100);

/// Cycle-counter reads issued before the session starts.
const WARMUP_READS: usize = 4;

struct State {
    table: EntryTable,
    session: Session,
}

/// Hierarchical zone profiler for a single thread of measurement.
///
/// All bookkeeping lives in this value and is reached through `&self`, so
/// nested zone guards can coexist. The profiler is not `Sync`: zones begun and
/// ended from different threads would corrupt the parent chain.
///
/// Every `begin_zone` must be matched by exactly one `end_zone` in LIFO order.
/// An unmatched zone leaves the current-zone pointer on a stale entry and
/// skews exclusive times for the rest of the session; this is not detected.
pub struct Profiler<C: Tracking = DefaultTracking, K: ClockSource = HardwareClock> {
    clock: K,
    state: RefCell<State>,
    calibration_wait: Duration,
    _tracking: PhantomData<C>,
}

impl<C: Tracking, K: ClockSource + Default> Default for Profiler<C, K> {
    fn default() -> Self {
        Self::with_clock(K::default())
    }
}

impl<C: Tracking> Profiler<C, HardwareClock> {
    /// Create a profiler on the hardware clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(HardwareClock)
    }
}

impl<C: Tracking, K: ClockSource> Profiler<C, K> {
    /// Create a profiler on a custom clock.
    pub fn with_clock(clock: K) -> Self {
        // A disabled profiler never indexes the table.
        let capacity = if C::ENABLED { C::CAPACITY } else { 0 };
        Self {
            clock,
            state: RefCell::new(State {
                table: EntryTable::new(capacity),
                session: Session::default(),
            }),
            calibration_wait: DEFAULT_CALIBRATION_WAIT,
            _tracking: PhantomData,
        }
    }

    /// Set how long the reporter spends calibrating the cycle counter.
    ///
    /// Calibration runs in whole milliseconds; shorter waits round up to 1 ms.
    #[must_use]
    pub fn with_calibration_wait(mut self, wait: Duration) -> Self {
        self.calibration_wait = wait;
        self
    }

    pub const fn clock(&self) -> &K {
        &self.clock
    }

    /// Start the session, clearing everything recorded so far.
    ///
    /// The session is the whole program run by convention; there is one.
    pub fn begin_session(&self) {
        if !C::ENABLED {
            return;
        }

        for _ in 0..WARMUP_READS {
            let _ = self.clock.read_cycle_counter();
        }

        {
            let mut state = self.state.borrow_mut();
            state.table.reset();
            state.session = Session::default();
            if C::PAGE_FAULTS {
                state.session.start_page_faults = self.clock.read_page_faults();
            }
        }
        tracing::debug!(capacity = C::CAPACITY, "Profiling session started");

        let start_ticks = self.clock.read_cycle_counter();
        self.state.borrow_mut().session.start_ticks = start_ticks;
    }

    /// End the session.
    pub fn end_session(&self) {
        if !C::ENABLED {
            return;
        }

        let end_ticks = self.clock.read_cycle_counter();
        let mut state = self.state.borrow_mut();
        state.session.end_ticks = end_ticks;
        if C::PAGE_FAULTS {
            state.session.end_page_faults = self.clock.read_page_faults();
        }
        tracing::debug!(
            elapsed_ticks = state.session.elapsed_ticks(),
            "Profiling session ended"
        );
    }

    /// Open a zone. `byte_count` is added to the entry's bandwidth total
    /// immediately.
    #[inline]
    pub fn begin_zone(&self, name: &'static str, index: ZoneIndex, byte_count: u64) -> ActiveZone {
        if !C::ENABLED {
            return ActiveZone::NULL;
        }

        let mut zone = {
            let mut state = self.state.borrow_mut();
            let entry = &mut state.table[index];
            if C::BANDWIDTH {
                entry.bytes_processed = entry.bytes_processed.wrapping_add(byte_count);
            }
            let inclusive_ticks_snapshot = entry.inclusive_ticks;

            let parent_index = state.session.current_index;
            state.session.current_index = index;

            ActiveZone {
                name,
                entry_index: index,
                parent_index,
                start_ticks: 0,
                inclusive_ticks_snapshot,
                start_page_faults: 0,
                byte_count,
            }
        };

        if C::PAGE_FAULTS {
            zone.start_page_faults = self.clock.read_page_faults();
        }
        zone.start_ticks = self.clock.read_cycle_counter();
        zone
    }

    /// Close a zone, attributing its elapsed ticks.
    #[inline]
    pub fn end_zone(&self, zone: ActiveZone) {
        if !C::ENABLED {
            return;
        }

        let end_ticks = self.clock.read_cycle_counter();
        let elapsed = end_ticks.wrapping_sub(zone.start_ticks);
        let end_page_faults = if C::PAGE_FAULTS {
            self.clock.read_page_faults()
        } else {
            0
        };

        let mut state = self.state.borrow_mut();

        let parent = &mut state.table[zone.parent_index];
        parent.exclusive_ticks = parent.exclusive_ticks.wrapping_sub(elapsed);

        let entry = &mut state.table[zone.entry_index];
        entry.inclusive_ticks = zone.inclusive_ticks_snapshot.wrapping_add(elapsed);
        entry.exclusive_ticks = entry.exclusive_ticks.wrapping_add(elapsed);
        entry.hit_count += 1;
        entry.name = zone.name;
        if C::PAGE_FAULTS {
            entry.page_fault_count = end_page_faults.wrapping_sub(zone.start_page_faults);
        }
        if C::MIN_MAX {
            entry.record_extremes(elapsed);
        }

        state.session.current_index = zone.parent_index;
    }

    /// Open a zone that closes when the returned guard drops.
    #[inline]
    pub fn zone(&self, name: &'static str, index: ZoneIndex) -> ZoneGuard<'_, C, K> {
        ZoneGuard::new(self, self.begin_zone(name, index, 0))
    }

    /// Like [`Profiler::zone`], declaring the bytes the zone processes.
    #[inline]
    pub fn zone_with_bytes(
        &self,
        name: &'static str,
        index: ZoneIndex,
        byte_count: u64,
    ) -> ZoneGuard<'_, C, K> {
        ZoneGuard::new(self, self.begin_zone(name, index, byte_count))
    }

    /// Resolve a call site's memoized index against this profiler's capacity.
    ///
    /// # Panics
    ///
    /// Panics when the index does not fit this profiler's entry table.
    #[inline]
    pub fn slot_index(&self, slot: &ZoneSlot) -> ZoneIndex {
        slot.index::<C>()
    }

    /// Statistics for one zone, if it has been hit.
    #[must_use]
    pub fn entry(&self, index: ZoneIndex) -> Option<ZoneEntry> {
        if index.is_root() {
            return None;
        }
        let state = self.state.borrow();
        state
            .table
            .get(index)
            .filter(|entry| entry.hit_count > 0)
            .copied()
    }

    /// All zones hit so far, in index order.
    #[must_use]
    pub fn entries(&self) -> Vec<(ZoneIndex, ZoneEntry)> {
        let state = self.state.borrow();
        state
            .table
            .recorded()
            .map(|(index, entry)| (index, *entry))
            .collect()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.state.borrow().session
    }

    /// Calibrate the clock and snapshot the results.
    ///
    /// Falls back to raw ticks when calibration fails.
    #[must_use]
    pub fn report(&self) -> Report {
        let cpu_frequency = self
            .clock
            .estimate_cycles_per_second(calibration_millis(self.calibration_wait));
        if cpu_frequency == 0 {
            tracing::warn!("Failed to estimate CPU frequency, reporting raw ticks");
        }
        self.report_with_frequency(cpu_frequency)
    }

    /// Snapshot the results with a known cycle-counter frequency (0 = unknown).
    #[must_use]
    pub fn report_with_frequency(&self, cpu_frequency: u64) -> Report {
        let state = self.state.borrow();
        Report::build::<C>(&state.session, state.table.recorded(), cpu_frequency)
    }

    /// Write the report to `out`.
    pub fn write_results<W: Write>(&self, out: &mut W) -> Result<()> {
        let report = self.report();
        write!(out, "{report}")?;
        out.flush()?;
        Ok(())
    }

    /// Print the report to stdout.
    pub fn print_results(&self) -> Result<()> {
        self.write_results(&mut io::stdout().lock())
    }
}

fn calibration_millis(wait: Duration) -> u64 {
    u64::try_from(wait.as_millis()).unwrap_or(u64::MAX).max(1)
}
