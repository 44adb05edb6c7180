//! Cyclezone profiler demo.
//!
//! Runs a synthetic workload under the profiler and prints the zone report.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p cyclezone-demo -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `-s, --size <BYTES>`: Bytes generated per iteration (default: 8388608)
//! - `-i, --iterations <N>`: Workload iterations (default: 4)
//! - `--chunk <BYTES>`: Chunk length for the sort pass (default: 65536)
//! - `--fib <N>`: Recursive Fibonacci argument (default: 20)
//! - `--calibration-ms <MS>`: CPU frequency calibration time (default: 100)
//! - `--json`: Print the report as JSON
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod workload;

use std::time::Duration;

use cyclezone_profiler::{Profiler, DEFAULT_CALIBRATION_WAIT};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::workload::WorkloadConfig;

#[derive(Debug)]
struct Options {
    workload: WorkloadConfig,
    calibration_wait: Duration,
    json: bool,
}

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args()?;
    info!(
        size = options.workload.size,
        iterations = options.workload.iterations,
        "Running workload"
    );

    let profiler: Profiler = Profiler::new().with_calibration_wait(options.calibration_wait);
    profiler.begin_session();
    let output = workload::run(&profiler, &options.workload);
    profiler.end_session();

    info!(
        checksum = output.checksum,
        most_common_byte = output.most_common_byte,
        fib = output.fib,
        "Workload finished"
    );

    if options.json {
        println!("{}", serde_json::to_string_pretty(&profiler.report())?);
    } else {
        profiler.print_results()?;
    }
    Ok(())
}

fn parse_args() -> anyhow::Result<Options> {
    let mut options = Options {
        workload: WorkloadConfig::default(),
        calibration_wait: DEFAULT_CALIBRATION_WAIT,
        json: false,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow::anyhow!("{flag} expects a value"))
        };
        match arg.as_str() {
            "-s" | "--size" => options.workload.size = value(&arg)?.parse()?,
            "-i" | "--iterations" => options.workload.iterations = value(&arg)?.parse()?,
            "--chunk" => options.workload.chunk = value(&arg)?.parse()?,
            "--fib" => options.workload.fib = value(&arg)?.parse()?,
            "--calibration-ms" => {
                options.calibration_wait = Duration::from_millis(value(&arg)?.parse()?);
            }
            "--json" => options.json = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(options)
}

fn print_help() {
    eprintln!(
        "Cyclezone Profiler Demo

Usage: cyclezone-demo [OPTIONS]

Options:
  -s, --size <BYTES>       Bytes generated per iteration (default: 8388608)
  -i, --iterations <N>     Workload iterations (default: 4)
      --chunk <BYTES>      Chunk length for the sort pass (default: 65536)
      --fib <N>            Recursive Fibonacci argument (default: 20)
      --calibration-ms <MS>
                           CPU frequency calibration time (default: 100)
      --json               Print the report as JSON
  -h, --help               Print this help message

Environment:
  RUST_LOG                 Log level (e.g., info, debug, trace)"
    );
}
