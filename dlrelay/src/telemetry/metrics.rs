//! Atomic relay counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::TelemetrySnapshot;

/// Counters shared by every session of a relay.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    sessions_staged: AtomicU64,
    staging_failures: AtomicU64,
    deliveries: AtomicU64,
    bytes_delivered: AtomicU64,
    skipped: AtomicU64,
    timeouts: AtomicU64,
    stream_failures: AtomicU64,
    send_failures: AtomicU64,
    io_failures: AtomicU64,
    cleanup_failures: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_staged(&self) {
        self.sessions_staged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn staging_failed(&self) {
        self.staging_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A file was handed to the client, `bytes` long.
    pub fn delivered(&self, bytes: u64) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timed_out(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_failed(&self) {
        self.stream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A session ended on a filesystem error before anything was sent.
    pub fn io_failed(&self) {
        self.io_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A directory or file could not be removed.
    pub fn cleanup_failed(&self) {
        self.cleanup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            sessions_staged: self.sessions_staged.load(Ordering::Relaxed),
            staging_failures: self.staging_failures.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            stream_failures: self.stream_failures.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            io_failures: self.io_failures.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = RelayMetrics::new();
        metrics.session_staged();
        metrics.session_staged();
        metrics.delivered(100);
        metrics.delivered(50);
        metrics.cleanup_failed();
        metrics.io_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_staged, 2);
        assert_eq!(snapshot.deliveries, 2);
        assert_eq!(snapshot.bytes_delivered, 150);
        assert_eq!(snapshot.cleanup_failures, 1);
        assert_eq!(snapshot.io_failures, 1);
        assert_eq!(snapshot.timeouts, 0);
    }
}
