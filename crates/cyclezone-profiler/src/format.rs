//! Human-readable units for report output.

const SI_PREFIXES: [&str; 6] = ["k", "M", "G", "T", "P", "E"];
const BINARY_PREFIXES: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Convert ticks to seconds at `cpu_frequency` ticks per second.
#[must_use]
pub fn ticks_to_seconds(ticks: u64, cpu_frequency: u64) -> f64 {
    if cpu_frequency == 0 {
        return 0.0;
    }
    ticks as f64 / cpu_frequency as f64
}

/// `part` as a percentage of `total`, 0 when `total` is 0.
#[must_use]
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Format a duration, picking the largest unit the value reaches
/// (h, min, s, ms, us, ns).
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds >= 3600.0 {
        format!("{:.4}h", seconds / 3600.0)
    } else if seconds >= 60.0 {
        format!("{:.4}min", seconds / 60.0)
    } else if seconds >= 1.0 {
        format!("{seconds:.4}s")
    } else if seconds >= 1e-3 {
        format!("{:.4}ms", seconds * 1e3)
    } else if seconds >= 1e-6 {
        format!("{:.4}us", seconds * 1e6)
    } else {
        format!("{:.4}ns", seconds * 1e9)
    }
}

/// Format a count with SI prefixes (1.50k, 2.00M, ...).
#[must_use]
pub fn format_count(count: u64) -> String {
    if count < 1000 {
        return count.to_string();
    }
    let mut value = count as f64;
    let mut prefix = SI_PREFIXES[0];
    for candidate in SI_PREFIXES {
        value /= 1000.0;
        prefix = candidate;
        if value < 1000.0 {
            break;
        }
    }
    format!("{value:.2}{prefix}")
}

/// Format a byte count with binary prefixes (512 B, 4.00 KiB, ...).
#[must_use]
pub fn format_bytes(bytes: f64) -> String {
    if bytes < 1024.0 {
        return format!("{bytes:.0} B");
    }
    let mut value = bytes;
    let mut prefix = BINARY_PREFIXES[0];
    for candidate in BINARY_PREFIXES {
        value /= 1024.0;
        prefix = candidate;
        if value < 1024.0 {
            break;
        }
    }
    format!("{value:.2} {prefix}")
}

/// Format `bytes` processed over `seconds` as a rate.
#[must_use]
pub fn format_bandwidth(bytes: f64, seconds: f64) -> String {
    if seconds <= 0.0 {
        return "n/a".to_string();
    }
    format!("{}/s", format_bytes(bytes / seconds))
}

/// Format a frequency in Hz, kHz, MHz or GHz.
#[must_use]
pub fn format_frequency(hertz: f64) -> String {
    let mut value = hertz;
    let mut unit = "Hz";
    for candidate in ["kHz", "MHz", "GHz"] {
        if value <= 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = candidate;
    }
    format!("{value:.2} {unit}")
}
