//! Compile-time tracking options.
//!
//! Every option is an associated constant, so branches on them fold away and
//! a profiler built with [`Disabled`] compiles to no-ops.

/// Default number of entry slots, including the reserved root slot.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Which statistics a [`Profiler`](crate::Profiler) records.
pub trait Tracking: 'static {
    /// Record anything at all.
    const ENABLED: bool = true;
    /// Sample OS page faults on zone entry/exit and around the session.
    const PAGE_FAULTS: bool = false;
    /// Keep per-zone minimum and maximum inclusive ticks.
    const MIN_MAX: bool = false;
    /// Accumulate caller-declared byte counts.
    const BANDWIDTH: bool = false;
    /// Entry table size. Index 0 is the root, so `CAPACITY - 1` zones fit.
    const CAPACITY: usize = DEFAULT_CAPACITY;
}

/// Every statistic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Full;

impl Tracking for Full {
    const PAGE_FAULTS: bool = true;
    const MIN_MAX: bool = true;
    const BANDWIDTH: bool = true;
}

/// Inclusive/exclusive ticks and hit counts only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingOnly;

impl Tracking for TimingOnly {}

/// Nothing is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl Tracking for Disabled {
    const ENABLED: bool = false;
}

/// Options selected by the crate's Cargo features.
///
/// `profiling` turns recording on; `page-faults`, `min-max` and `bandwidth`
/// add the optional statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTracking;

impl Tracking for DefaultTracking {
    const ENABLED: bool = cfg!(feature = "profiling");
    const PAGE_FAULTS: bool = cfg!(feature = "page-faults");
    const MIN_MAX: bool = cfg!(feature = "min-max");
    const BANDWIDTH: bool = cfg!(feature = "bandwidth");
}
