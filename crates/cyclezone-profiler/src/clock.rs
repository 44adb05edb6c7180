//! Cycle counter, reference clock and page-fault sources.
//!
//! The profiler measures everything in raw cycle-counter ticks and only
//! converts to wall time when printing. The conversion factor comes from
//! [`ClockSource::estimate_cycles_per_second`], which races the cycle counter
//! against the OS monotonic clock.

use std::cell::Cell;
use std::sync::OnceLock;
use std::time::Instant;

/// Frequency of the nanosecond reference clock.
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Consecutive identical reference reads after which calibration gives up.
const MAX_STALLED_POLLS: u32 = 1_000_000;

/// A reading of the OS reference clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceReading {
    /// Current counter value.
    pub ticks: u64,
    /// Counter ticks per second.
    pub frequency: u64,
}

/// Timer primitives the profiler is built on.
///
/// Implementations must be monotonic. The cycle counter does not need a known
/// frequency; the reference counter does.
pub trait ClockSource {
    /// Read the cycle counter.
    fn read_cycle_counter(&self) -> u64;

    /// Read the OS monotonic reference clock.
    fn read_reference_counter(&self) -> ReferenceReading;

    /// Read the page-fault count of the current process.
    fn read_page_faults(&self) -> u64;

    /// Estimate cycle-counter ticks per second.
    ///
    /// Busy-waits until the reference clock has advanced by `wait_millis`
    /// and scales the cycle delta by the reference delta. Returns 0 when the
    /// reference clock reports no frequency or does not advance.
    fn estimate_cycles_per_second(&self, wait_millis: u64) -> u64 {
        let start = self.read_reference_counter();
        let wait_ticks = start.frequency.saturating_mul(wait_millis) / 1000;
        let cycles_start = self.read_cycle_counter();

        let mut reference_elapsed = 0;
        let mut last_ticks = start.ticks;
        let mut stalled_polls = 0;
        while reference_elapsed < wait_ticks {
            let now = self.read_reference_counter().ticks;
            if now == last_ticks {
                stalled_polls += 1;
                if stalled_polls >= MAX_STALLED_POLLS {
                    break;
                }
            } else {
                stalled_polls = 0;
                last_ticks = now;
            }
            reference_elapsed = now.wrapping_sub(start.ticks);
        }

        let cycles_elapsed = self.read_cycle_counter().wrapping_sub(cycles_start);
        if reference_elapsed == 0 {
            return 0;
        }

        let estimate = u128::from(start.frequency) * u128::from(cycles_elapsed)
            / u128::from(reference_elapsed);
        u64::try_from(estimate).unwrap_or(u64::MAX)
    }
}

/// The real hardware clock: TSC / virtual counter, `Instant`, `getrusage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareClock;

impl ClockSource for HardwareClock {
    #[inline]
    fn read_cycle_counter(&self) -> u64 {
        read_cycle_counter()
    }

    #[inline]
    fn read_reference_counter(&self) -> ReferenceReading {
        ReferenceReading {
            ticks: reference_nanos(),
            frequency: NANOS_PER_SECOND,
        }
    }

    #[inline]
    fn read_page_faults(&self) -> u64 {
        read_page_faults()
    }
}

/// Read the hardware cycle counter with serializing fences on both sides.
///
/// On x86_64 this is `lfence; rdtsc; lfence`, on aarch64 `isb; mrs cntvct_el0`.
/// Other targets fall back to a nanosecond counter derived from `Instant`.
#[inline]
#[must_use]
pub fn read_cycle_counter() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        read_cycle_counter_x86_64()
    }

    #[cfg(target_arch = "aarch64")]
    {
        read_cycle_counter_aarch64()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        reference_nanos()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
#[allow(unused_unsafe)]
fn read_cycle_counter_x86_64() -> u64 {
    use std::arch::x86_64::{_mm_lfence, _rdtsc};

    // SAFETY: lfence (SSE2) and rdtsc are part of the x86_64 baseline.
    unsafe {
        _mm_lfence();
        let ticks = _rdtsc();
        _mm_lfence();
        ticks
    }
}

#[cfg(target_arch = "aarch64")]
#[inline]
fn read_cycle_counter_aarch64() -> u64 {
    std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);

    let ticks: u64;
    // SAFETY: cntvct_el0 is readable from EL0 on every aarch64 OS we target.
    unsafe {
        std::arch::asm!(
            "isb",
            "mrs {}, cntvct_el0",
            out(reg) ticks,
            options(nostack, nomem),
        );
    }

    std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
    ticks
}

/// Nanoseconds since the first call in this process.
fn reference_nanos() -> u64 {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();

    let anchor = ANCHOR.get_or_init(Instant::now);
    u64::try_from(anchor.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Minor plus major page faults of the current process.
#[cfg(unix)]
#[must_use]
pub fn read_page_faults() -> u64 {
    // SAFETY: rusage is plain old data, all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: the pointer is valid for writes of one rusage.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return 0;
    }

    let minor = u64::try_from(usage.ru_minflt).unwrap_or(0);
    let major = u64::try_from(usage.ru_majflt).unwrap_or(0);
    minor.wrapping_add(major)
}

/// Page faults are not available on this platform.
#[cfg(not(unix))]
#[must_use]
pub const fn read_page_faults() -> u64 {
    0
}

/// A deterministic clock advanced by hand.
///
/// Cycle and page-fault counters only move when told to. In ticking mode every
/// reference read advances the reference counter by one tick and the cycle
/// counter by a fixed amount, which makes calibration produce an exact,
/// predictable frequency.
#[derive(Debug)]
pub struct ManualClock {
    cycles: Cell<u64>,
    reference_ticks: Cell<u64>,
    reference_frequency: u64,
    cycles_per_reference_tick: Option<u64>,
    page_faults: Cell<u64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// A clock whose reference counter never advances, so calibration fails.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycles: Cell::new(0),
            reference_ticks: Cell::new(0),
            reference_frequency: NANOS_PER_SECOND,
            cycles_per_reference_tick: None,
            page_faults: Cell::new(0),
        }
    }

    /// A clock that calibrates to `reference_frequency * cycles_per_reference_tick`
    /// cycles per second.
    #[must_use]
    pub const fn ticking(reference_frequency: u64, cycles_per_reference_tick: u64) -> Self {
        Self {
            cycles: Cell::new(0),
            reference_ticks: Cell::new(0),
            reference_frequency,
            cycles_per_reference_tick: Some(cycles_per_reference_tick),
            page_faults: Cell::new(0),
        }
    }

    /// Advance the cycle counter.
    pub fn advance(&self, cycles: u64) {
        self.cycles.set(self.cycles.get().wrapping_add(cycles));
    }

    /// Current cycle counter value.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.get()
    }

    /// Add page faults to the process counter.
    pub fn add_page_faults(&self, faults: u64) {
        self.page_faults.set(self.page_faults.get() + faults);
    }
}

impl ClockSource for ManualClock {
    fn read_cycle_counter(&self) -> u64 {
        self.cycles.get()
    }

    fn read_reference_counter(&self) -> ReferenceReading {
        if let Some(step) = self.cycles_per_reference_tick {
            self.reference_ticks.set(self.reference_ticks.get() + 1);
            self.advance(step);
        }
        ReferenceReading {
            ticks: self.reference_ticks.get(),
            frequency: self.reference_frequency,
        }
    }

    fn read_page_faults(&self) -> u64 {
        self.page_faults.get()
    }
}
