//! Profiling macros and zone guards.

use crate::clock::ClockSource;
use crate::profiler::Profiler;
use crate::tracking::Tracking;
use crate::zone::ActiveZone;

/// RAII guard that ends its zone on drop.
#[must_use = "the zone ends as soon as the guard is dropped"]
pub struct ZoneGuard<'p, C: Tracking, K: ClockSource> {
    profiler: &'p Profiler<C, K>,
    zone: Option<ActiveZone>,
}

impl<'p, C: Tracking, K: ClockSource> ZoneGuard<'p, C, K> {
    #[inline]
    pub(crate) const fn new(profiler: &'p Profiler<C, K>, zone: ActiveZone) -> Self {
        Self {
            profiler,
            zone: Some(zone),
        }
    }

    /// End the zone now instead of at end of scope.
    #[inline]
    pub fn end(mut self) {
        self.finish();
    }

    #[inline]
    fn finish(&mut self) {
        if let Some(zone) = self.zone.take() {
            self.profiler.end_zone(zone);
        }
    }
}

impl<C: Tracking, K: ClockSource> Drop for ZoneGuard<'_, C, K> {
    #[inline]
    fn drop(&mut self) {
        self.finish();
    }
}

/// Name of the enclosing function, without its module path. Closures report
/// the function they are defined in.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn __zone_marker() {}
        let path = ::std::any::type_name_of_val(&__zone_marker);
        let path = path.strip_suffix("::__zone_marker").unwrap_or(path);
        path.rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(path)
    }};
}

/// Open a zone that lasts until the end of the enclosing scope.
///
/// The zone index is assigned once per call site. When the `profiling`
/// feature is disabled, this macro expands to nothing.
///
/// # Examples
///
/// ```ignore
/// use cyclezone_profiler::{profile_zone, Profiler};
///
/// fn parse(profiler: &Profiler, input: &str) {
///     profile_zone!(profiler, "parse");
///     // ... parsing code
/// } // zone ends here
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_zone {
    ($profiler:expr, $name:expr) => {
        let _zone_guard = {
            static SLOT: $crate::ZoneSlot = $crate::ZoneSlot::new();
            let profiler = &$profiler;
            profiler.zone($name, profiler.slot_index(&SLOT))
        };
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_zone {
    ($profiler:expr, $name:expr) => {
        let _ = &$profiler;
    };
}

/// Open a zone that also counts `bytes` toward the zone's bandwidth.
///
/// When the `profiling` feature is disabled, this macro expands to nothing.
///
/// ```ignore
/// profile_bandwidth!(profiler, "checksum", buffer.len() as u64);
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_bandwidth {
    ($profiler:expr, $name:expr, $bytes:expr) => {
        let _zone_guard = {
            static SLOT: $crate::ZoneSlot = $crate::ZoneSlot::new();
            let profiler = &$profiler;
            profiler.zone_with_bytes($name, profiler.slot_index(&SLOT), $bytes)
        };
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_bandwidth {
    ($profiler:expr, $name:expr, $bytes:expr) => {
        let _ = &$profiler;
    };
}

/// Open a zone named after the enclosing function.
///
/// When the `profiling` feature is disabled, this macro expands to nothing.
///
/// ```ignore
/// fn simulate(profiler: &Profiler) {
///     profile_function!(profiler);
///     // ...
/// }
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_function {
    ($profiler:expr) => {
        $crate::profile_zone!($profiler, $crate::__function_name!());
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_function {
    ($profiler:expr) => {
        let _ = &$profiler;
    };
}
