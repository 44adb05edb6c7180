//! Hierarchical CPU-cycle profiler.
//!
//! Code regions ("zones") are timed with the hardware cycle counter. Each
//! zone's time is split into inclusive time (everything it calls) and
//! exclusive time (its own code), without keeping an explicit call stack:
//! every open zone remembers which zone was current when it started, and on
//! exit subtracts its elapsed ticks from that parent's exclusive total.
//!
//! Optional statistics (page faults, min/max latency, bandwidth) are chosen at
//! compile time through the [`Tracking`] trait.
//!
//! # Feature Flags
//!
//! - `profiling`: Enable profiling instrumentation. When disabled, all profiling
//!   macros expand to no-ops and [`DefaultTracking`] records nothing.
//! - `page-faults`, `min-max`, `bandwidth`: Add the optional statistics to
//!   [`DefaultTracking`].
//!
//! # Usage
//!
//! Create one profiler for the measured thread and bracket the run with a
//! session:
//!
//! ```ignore
//! use cyclezone_profiler::{profile_zone, Profiler};
//!
//! let profiler: Profiler = Profiler::new();
//! profiler.begin_session();
//! {
//!     profile_zone!(profiler, "load");
//!     // ... code to measure
//! }
//! profiler.end_session();
//! profiler.print_results()?;
//! ```
//!
//! The explicit form, without macros:
//!
//! ```ignore
//! static LOAD: ZoneSlot = ZoneSlot::new();
//!
//! let zone = profiler.begin_zone("load", profiler.slot_index(&LOAD), 0);
//! // ... code to measure
//! profiler.end_zone(zone);
//! ```

pub mod clock;
mod entry;
mod error;
pub mod format;
mod macros;
mod profiler;
mod report;
mod session;
mod tracking;
mod zone;

// Re-export public API
pub use clock::{ClockSource, HardwareClock, ManualClock, ReferenceReading};
pub use entry::ZoneEntry;
pub use error::{Error, Result};
pub use macros::ZoneGuard;
pub use profiler::{Profiler, DEFAULT_CALIBRATION_WAIT};
pub use report::{Extremes, Report, ZoneReport};
pub use session::Session;
pub use tracking::{Disabled, DefaultTracking, Full, TimingOnly, Tracking, DEFAULT_CAPACITY};
pub use zone::{next_zone_index, try_next_zone_index, ActiveZone, ZoneIndex, ZoneSlot};
