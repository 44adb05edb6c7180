//! Error types for the profiler.

use thiserror::Error;

/// Profiler error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while writing a report
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// More distinct zones were registered than the entry table holds
    #[error("Zone table capacity exceeded: index {index} does not fit in {capacity} entries")]
    CapacityExceeded { index: u32, capacity: usize },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
