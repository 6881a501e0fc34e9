//! Point-in-time view of relay counters.

use std::fmt;

/// Copy of [`RelayMetrics`](super::RelayMetrics) at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub sessions_staged: u64,
    pub staging_failures: u64,
    pub deliveries: u64,
    pub bytes_delivered: u64,
    pub skipped: u64,
    pub timeouts: u64,
    pub stream_failures: u64,
    pub send_failures: u64,
    pub io_failures: u64,
    pub cleanup_failures: u64,
}

impl TelemetrySnapshot {
    /// Sessions that ended in any way.
    pub fn sessions_finished(&self) -> u64 {
        self.deliveries
            + self.skipped
            + self.timeouts
            + self.stream_failures
            + self.send_failures
            + self.io_failures
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "staged {}, delivered {} ({} bytes), skipped {}, timed out {}, failed {}, cleanup failures {}",
            self.sessions_staged,
            self.deliveries,
            self.bytes_delivered,
            self.skipped,
            self.timeouts,
            self.stream_failures + self.send_failures + self.io_failures,
            self.cleanup_failures
        )
    }
}
