//! Bounds of the measured run.

use serde::Serialize;

use crate::zone::ZoneIndex;

/// Start/end samples of the one measured run, plus the current-zone pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub start_ticks: u64,
    pub end_ticks: u64,
    pub start_page_faults: u64,
    pub end_page_faults: u64,
    /// Zone that is open right now, [`ZoneIndex::ROOT`] when none is.
    pub current_index: ZoneIndex,
}

impl Session {
    /// Ticks between session begin and end.
    #[must_use]
    pub const fn elapsed_ticks(&self) -> u64 {
        self.end_ticks.wrapping_sub(self.start_ticks)
    }

    /// Page faults between session begin and end.
    #[must_use]
    pub const fn page_faults(&self) -> u64 {
        self.end_page_faults.wrapping_sub(self.start_page_faults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_and_faults() {
        let session = Session {
            start_ticks: 100,
            end_ticks: 350,
            start_page_faults: 10,
            end_page_faults: 14,
            current_index: ZoneIndex::ROOT,
        };
        assert_eq!(session.elapsed_ticks(), 250);
        assert_eq!(session.page_faults(), 4);
    }
}
