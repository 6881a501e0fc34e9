//! Relay telemetry for operators.
//!
//! Lock-free counters record each session's fate. Cleanup failures are
//! counted here as well as logged, so leaked session directories show up
//! without grepping logs.
//!
//! ```text
//! Stager / Watcher / Streamer ─────► RelayMetrics ─────► TelemetrySnapshot
//!                                    (atomic counters)   (point-in-time copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::RelayMetrics;
pub use snapshot::TelemetrySnapshot;
