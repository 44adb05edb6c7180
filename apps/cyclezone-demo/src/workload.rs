//! Synthetic workload exercising nested, repeated, recursive and
//! byte-counted zones.

use cyclezone_profiler::{profile_bandwidth, profile_function, profile_zone, Profiler};

/// Workload parameters.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadConfig {
    /// Bytes generated per iteration.
    pub size: usize,
    /// Number of generate/checksum/sort passes.
    pub iterations: u32,
    /// Chunk length for the sort pass.
    pub chunk: usize,
    /// Argument of the recursive Fibonacci zone.
    pub fib: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            size: 8 * 1024 * 1024,
            iterations: 4,
            chunk: 64 * 1024,
            fib: 20,
        }
    }
}

/// Summary values, printed so the work cannot be optimized out.
#[derive(Debug, Default)]
pub struct WorkloadOutput {
    pub checksum: u64,
    pub most_common_byte: u8,
    pub fib: u64,
}

pub fn run(profiler: &Profiler, config: &WorkloadConfig) -> WorkloadOutput {
    profile_function!(profiler);

    let mut output = WorkloadOutput::default();
    for seed in 0..config.iterations {
        profile_zone!(profiler, "iteration");

        let mut data = generate(profiler, config.size, u64::from(seed) + 1);
        output.checksum ^= checksum(profiler, &data);
        output.most_common_byte = most_common_byte(profiler, &data);
        sort_chunks(profiler, &mut data, config.chunk);
    }
    output.fib = fib(profiler, config.fib);
    output
}

fn generate(profiler: &Profiler, size: usize, seed: u64) -> Vec<u8> {
    profile_bandwidth!(profiler, "generate", size as u64);

    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state.to_le_bytes()[0]
        })
        .collect()
}

fn checksum(profiler: &Profiler, data: &[u8]) -> u64 {
    profile_bandwidth!(profiler, "checksum", data.len() as u64);

    data.iter().fold(0xCBF2_9CE4_8422_2325, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01B3)
    })
}

fn most_common_byte(profiler: &Profiler, data: &[u8]) -> u8 {
    profile_function!(profiler);

    let mut counts = [0u64; 256];
    for &byte in data {
        counts[usize::from(byte)] += 1;
    }
    counts
        .iter()
        .enumerate()
        .max_by_key(|&(_, count)| *count)
        .and_then(|(byte, _)| u8::try_from(byte).ok())
        .unwrap_or_default()
}

fn sort_chunks(profiler: &Profiler, data: &mut [u8], chunk: usize) {
    profile_bandwidth!(profiler, "sort", data.len() as u64);

    for part in data.chunks_mut(chunk.max(1)) {
        profile_bandwidth!(profiler, "sort chunk", part.len() as u64);
        part.sort_unstable();
    }
}

fn fib(profiler: &Profiler, n: u32) -> u64 {
    profile_function!(profiler);

    if n < 2 {
        return u64::from(n);
    }
    fib(profiler, n - 1) + fib(profiler, n - 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_workload_records_every_zone() {
        let profiler: Profiler = Profiler::new();
        let config = WorkloadConfig {
            size: 4096,
            iterations: 2,
            chunk: 1024,
            fib: 10,
        };

        profiler.begin_session();
        let output = run(&profiler, &config);
        profiler.end_session();

        assert_eq!(output.fib, 55);

        let report = profiler.report_with_frequency(0);
        for name in ["run", "iteration", "generate", "checksum", "sort", "sort chunk", "fib"] {
            assert!(report.zone(name).is_some(), "missing zone {name}");
        }
        assert_eq!(report.zone("iteration").unwrap().hit_count, 2);
        assert_eq!(report.zone("sort chunk").unwrap().hit_count, 8);
        assert_eq!(report.zone("generate").unwrap().bytes_processed, Some(8192));
    }
}
