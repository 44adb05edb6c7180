//! Final results: a data snapshot and its text rendering.

use std::fmt;

use serde::Serialize;

use crate::entry::ZoneEntry;
use crate::format::{
    format_bandwidth, format_bytes, format_count, format_duration, format_frequency, percentage,
    ticks_to_seconds,
};
use crate::session::Session;
use crate::tracking::Tracking;
use crate::zone::ZoneIndex;

/// Smallest and largest single-invocation inclusive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extremes {
    pub min_ticks: u64,
    pub max_ticks: u64,
}

/// One zone's line in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneReport {
    pub index: ZoneIndex,
    pub name: &'static str,
    pub hit_count: u64,
    pub inclusive_ticks: u64,
    pub exclusive_ticks: u64,
    /// Present when bandwidth is tracked and bytes were declared.
    pub bytes_processed: Option<u64>,
    /// Present when page faults are tracked.
    pub page_faults: Option<u64>,
    /// Present when min/max is tracked.
    pub extremes: Option<Extremes>,
}

/// Everything the profiler measured, ready to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Session length in cycle-counter ticks.
    pub total_ticks: u64,
    /// Estimated ticks per second, `None` when calibration failed.
    pub cpu_frequency: Option<u64>,
    /// Session page faults, when tracked.
    pub page_faults: Option<u64>,
    /// Zones with recorded time, in index order.
    pub zones: Vec<ZoneReport>,
}

impl Report {
    pub(crate) fn build<'a, C: Tracking>(
        session: &Session,
        entries: impl Iterator<Item = (ZoneIndex, &'a ZoneEntry)>,
        cpu_frequency: u64,
    ) -> Self {
        let zones = entries
            .filter(|(_, entry)| entry.is_recorded())
            .map(|(index, entry)| ZoneReport {
                index,
                name: entry.name,
                hit_count: entry.hit_count,
                inclusive_ticks: entry.inclusive_ticks,
                exclusive_ticks: entry.exclusive_ticks,
                bytes_processed: (C::BANDWIDTH && entry.bytes_processed > 0)
                    .then_some(entry.bytes_processed),
                page_faults: C::PAGE_FAULTS.then_some(entry.page_fault_count),
                extremes: C::MIN_MAX.then_some(Extremes {
                    min_ticks: entry.inclusive_ticks_min,
                    max_ticks: entry.inclusive_ticks_max,
                }),
            })
            .collect();

        Self {
            total_ticks: session.elapsed_ticks(),
            cpu_frequency: (cpu_frequency != 0).then_some(cpu_frequency),
            page_faults: C::PAGE_FAULTS.then(|| session.page_faults()),
            zones,
        }
    }

    /// Look a zone up by name.
    #[must_use]
    pub fn zone(&self, name: &str) -> Option<&ZoneReport> {
        self.zones.iter().find(|zone| zone.name == name)
    }

    fn fmt_timed(&self, f: &mut fmt::Formatter<'_>, cpu_frequency: u64) -> fmt::Result {
        writeln!(
            f,
            "Total time: {} @ {}",
            format_duration(ticks_to_seconds(self.total_ticks, cpu_frequency)),
            format_frequency(cpu_frequency as f64)
        )?;
        if let Some(page_faults) = self.page_faults {
            writeln!(f, "Page faults: {}", format_count(page_faults))?;
        }

        for zone in &self.zones {
            writeln!(f)?;
            zone.fmt_timed(f, self.total_ticks, cpu_frequency)?;
        }
        Ok(())
    }

    fn fmt_raw(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total ticks: {} (failed to estimate CPU frequency)",
            self.total_ticks
        )?;

        for zone in &self.zones {
            writeln!(f)?;
            writeln!(f, "  {} [hits: {}]", zone.name, format_count(zone.hit_count))?;
            if zone.is_leaf() {
                writeln!(f, "    incl/excl: {} ticks", zone.inclusive_ticks)?;
            } else {
                writeln!(
                    f,
                    "    incl: {} ticks, excl: {} ticks",
                    zone.inclusive_ticks, zone.exclusive_ticks
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cpu_frequency {
            Some(cpu_frequency) => self.fmt_timed(f, cpu_frequency),
            None => self.fmt_raw(f),
        }
    }
}

impl ZoneReport {
    /// Inclusive and exclusive time agree, i.e. no nested zone took time.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.inclusive_ticks == self.exclusive_ticks
    }

    /// Mean inclusive ticks per hit, only meaningful for repeated zones.
    #[must_use]
    pub fn average_inclusive_ticks(&self) -> Option<f64> {
        (self.hit_count > 1).then(|| self.inclusive_ticks as f64 / self.hit_count as f64)
    }

    /// Mean exclusive ticks per hit, only meaningful for repeated zones.
    #[must_use]
    pub fn average_exclusive_ticks(&self) -> Option<f64> {
        (self.hit_count > 1).then(|| self.exclusive_ticks as f64 / self.hit_count as f64)
    }

    fn fmt_timed(
        &self,
        f: &mut fmt::Formatter<'_>,
        total_ticks: u64,
        cpu_frequency: u64,
    ) -> fmt::Result {
        let seconds = |ticks: f64| ticks / cpu_frequency as f64;
        let timing = |ticks: u64| {
            format!(
                "{:.2}% {}",
                percentage(ticks, total_ticks),
                format_duration(ticks_to_seconds(ticks, cpu_frequency))
            )
        };

        writeln!(f, "  {} [hits: {}]", self.name, format_count(self.hit_count))?;
        if self.is_leaf() {
            writeln!(f, "    incl/excl: {}", timing(self.inclusive_ticks))?;
        } else {
            writeln!(
                f,
                "    incl: {}, excl: {}",
                timing(self.inclusive_ticks),
                timing(self.exclusive_ticks)
            )?;
        }

        let averages = self
            .average_inclusive_ticks()
            .zip(self.average_exclusive_ticks());
        if let Some((avg_inclusive, avg_exclusive)) = averages {
            if self.is_leaf() {
                writeln!(
                    f,
                    "    avg incl/excl: {}",
                    format_duration(seconds(avg_inclusive))
                )?;
            } else {
                writeln!(
                    f,
                    "    avg incl: {}, avg excl: {}",
                    format_duration(seconds(avg_inclusive)),
                    format_duration(seconds(avg_exclusive))
                )?;
            }
        }

        if let Some(bytes) = self.bytes_processed {
            let bytes = bytes as f64;
            write!(
                f,
                "    bandwidth: {} @ {}",
                format_bytes(bytes),
                format_bandwidth(bytes, seconds(self.inclusive_ticks as f64))
            )?;
            if let Some(avg_inclusive) = self.average_inclusive_ticks() {
                let avg_bytes = bytes / self.hit_count as f64;
                write!(
                    f,
                    ", avg: {} @ {}",
                    format_bytes(avg_bytes),
                    format_bandwidth(avg_bytes, seconds(avg_inclusive))
                )?;
            }
            writeln!(f)?;
        }

        if let Some(page_faults) = self.page_faults {
            write!(f, "    page faults: {}", format_count(page_faults))?;
            if self.hit_count > 1 {
                write!(f, ", avg: {:.2}", page_faults as f64 / self.hit_count as f64)?;
            }
            if let Some(bytes) = self.bytes_processed.filter(|_| page_faults > 0) {
                write!(
                    f,
                    " ({:.4} KiB/fault)",
                    bytes as f64 / 1024.0 / page_faults as f64
                )?;
            }
            writeln!(f)?;
        }

        if let Some(extremes) = self.extremes.filter(|_| self.hit_count > 1) {
            writeln!(
                f,
                "    min: {}, max: {}",
                format_duration(ticks_to_seconds(extremes.min_ticks, cpu_frequency)),
                format_duration(ticks_to_seconds(extremes.max_ticks, cpu_frequency))
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(inclusive_ticks: u64, exclusive_ticks: u64, hit_count: u64) -> ZoneReport {
        ZoneReport {
            index: ZoneIndex::new(1),
            name: "work",
            hit_count,
            inclusive_ticks,
            exclusive_ticks,
            bytes_processed: None,
            page_faults: None,
            extremes: None,
        }
    }

    #[test]
    fn raw_fallback_prints_ticks() {
        let report = Report {
            total_ticks: 1_000,
            cpu_frequency: None,
            page_faults: None,
            zones: vec![zone(600, 250, 1)],
        };

        let text = report.to_string();
        assert!(text.starts_with("Total ticks: 1000 (failed to estimate CPU frequency)"));
        assert!(text.contains("  work [hits: 1]"));
        assert!(text.contains("    incl: 600 ticks, excl: 250 ticks"));
        assert!(!text.contains('%'));
    }

    #[test]
    fn single_hit_has_no_averages() {
        let report = Report {
            total_ticks: 1_000,
            cpu_frequency: Some(1_000),
            page_faults: None,
            zones: vec![zone(500, 500, 1)],
        };

        let text = report.to_string();
        assert!(text.contains("    incl/excl: 50.00% 500.0000ms"));
        assert!(!text.contains("avg"));
    }

    #[test]
    fn repeated_zone_prints_averages() {
        let report = Report {
            total_ticks: 1_000,
            cpu_frequency: Some(1_000),
            page_faults: None,
            zones: vec![zone(800, 200, 4)],
        };

        let text = report.to_string();
        assert!(text.contains("    incl: 80.00% 800.0000ms, excl: 20.00% 200.0000ms"));
        assert!(text.contains("    avg incl: 200.0000ms, avg excl: 50.0000ms"));
    }

    #[test]
    fn extremes_need_more_than_one_hit() {
        let mut single = zone(10, 10, 1);
        single.extremes = Some(Extremes {
            min_ticks: 10,
            max_ticks: 10,
        });
        let report = Report {
            total_ticks: 10,
            cpu_frequency: Some(1_000),
            page_faults: None,
            zones: vec![single],
        };
        assert!(!report.to_string().contains("min:"));
    }

    #[test]
    fn zone_lookup_by_name() {
        let report = Report {
            total_ticks: 10,
            cpu_frequency: None,
            page_faults: None,
            zones: vec![zone(10, 10, 1)],
        };
        assert!(report.zone("work").is_some());
        assert!(report.zone("missing").is_none());
    }
}
