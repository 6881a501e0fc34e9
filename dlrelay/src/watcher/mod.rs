//! Download completion watcher.
//!
//! The browser gives no notification when a download finishes, so the
//! watcher polls the session directory. The first entry (in file-name order)
//! that does not carry the partial-download suffix is the finished file.
//!
//! # Algorithm
//!
//! ```text
//! loop ─► headers sent? ──yes──► skip
//!   │          │ no
//!   │          ▼
//!   │     scan directory ──► complete file ──► headers sent? ──yes──► skip
//!   │          │ empty / partial                   │ no
//!   └── sleep ◄┘                                   ▼
//!                                           ResponseStreamer
//!
//! every path ──► remove session directory
//! ```
//!
//! Polling is bounded by a deadline; expiry becomes
//! [`RelayError::PollTimeout`](crate::RelayError::PollTimeout) after cleanup.

mod scan;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::channel::{RequestMeta, ResponseChannel};
use crate::config::{DEFAULT_PARTIAL_SUFFIX, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_SECS};
use crate::delivery::{DeliveryReport, ResponseStreamer, TransferMode};
use crate::error::{RelayError, RelayResult};
use crate::session::DownloadSession;
use crate::telemetry::RelayMetrics;

use scan::{scan, DirectoryState};

pub use scan::is_partial;

/// Why nothing was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The response was already committed or closed.
    HeadersSent,
    /// The session directory disappeared before a file was found.
    NoFile,
}

/// Normal completion of a watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A file was handed to the streamer.
    Delivered(DeliveryReport),
    /// Nothing was sent. Not an error.
    Skipped(SkipReason),
}

enum Wait {
    Found(PathBuf),
    HeadersSent,
    DirectoryGone,
}

/// Polls a session directory and delivers the finished download.
#[derive(Debug, Clone)]
pub struct DownloadCompletionWatcher {
    poll_interval: Duration,
    poll_timeout: Duration,
    partial_suffix: String,
    streamer: ResponseStreamer,
    metrics: Arc<RelayMetrics>,
}

impl DownloadCompletionWatcher {
    /// Create a watcher with default timing that delivers through `streamer`.
    pub fn new(streamer: ResponseStreamer) -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            partial_suffix: DEFAULT_PARTIAL_SUFFIX.to_string(),
            streamer,
            metrics: Arc::new(RelayMetrics::new()),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the partial-download suffix. An empty suffix would mark every
    /// entry as partial, so it is ignored.
    pub fn with_partial_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        if !suffix.is_empty() {
            self.partial_suffix = suffix;
        }
        self
    }

    /// Record skips, timeouts, scan errors and cleanup failures in shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Wait for the session's download to finish and deliver it on `channel`.
    ///
    /// Returns `Skipped` when the response was committed before delivery
    /// could start. The session directory is removed on every path; removal
    /// failures are logged and counted, never returned.
    ///
    /// # Errors
    ///
    /// - `PollTimeout` if no finished file appears within the deadline.
    /// - `StreamDelivery` / `Io` from chunked delivery.
    pub async fn await_and_deliver<C>(
        &self,
        session: DownloadSession,
        channel: &mut C,
        request: &RequestMeta,
    ) -> RelayResult<WatchOutcome>
    where
        C: ResponseChannel + ?Sized,
    {
        let mode = TransferMode::from_request(request);
        debug!(
            session = %session.id(),
            path = %session.directory().display(),
            mode = %mode,
            "Waiting for download to finish"
        );

        let result = self.watch_and_deliver(&session, channel, mode).await;
        self.cleanup(session).await;

        match &result {
            Ok(WatchOutcome::Skipped(reason)) => {
                self.metrics.skipped();
                debug!(reason = ?reason, "Download not delivered");
            }
            Err(RelayError::PollTimeout { .. }) => self.metrics.timed_out(),
            _ => {}
        }
        result
    }

    async fn watch_and_deliver<C>(
        &self,
        session: &DownloadSession,
        channel: &mut C,
        mode: TransferMode,
    ) -> RelayResult<WatchOutcome>
    where
        C: ResponseChannel + ?Sized,
    {
        let directory = session.directory();
        let waited = tokio::time::timeout(self.poll_timeout, self.wait_for_file(directory, channel))
            .await
            .map_err(|_| {
                warn!(
                    session = %session.id(),
                    timeout_ms = self.poll_timeout.as_millis() as u64,
                    "Timed out waiting for download"
                );
                RelayError::PollTimeout {
                    directory: directory.to_path_buf(),
                    waited: self.poll_timeout,
                }
            })??;

        let file = match waited {
            Wait::Found(file) => file,
            Wait::HeadersSent => return Ok(WatchOutcome::Skipped(SkipReason::HeadersSent)),
            Wait::DirectoryGone => return Ok(WatchOutcome::Skipped(SkipReason::NoFile)),
        };

        // The response may have been committed since the last check
        if channel.headers_sent() {
            return Ok(WatchOutcome::Skipped(SkipReason::HeadersSent));
        }

        info!(session = %session.id(), file = %file.display(), "Download finished");
        let report = self.streamer.deliver(&file, channel, mode).await?;
        Ok(WatchOutcome::Delivered(report))
    }

    async fn wait_for_file<C>(&self, directory: &Path, channel: &C) -> RelayResult<Wait>
    where
        C: ResponseChannel + ?Sized,
    {
        loop {
            if channel.headers_sent() {
                return Ok(Wait::HeadersSent);
            }

            let state = scan(directory, &self.partial_suffix).await.map_err(|e| {
                self.metrics.io_failed();
                warn!(path = %directory.display(), error = %e, "Failed to scan download directory");
                RelayError::Io(e)
            })?;
            match state {
                DirectoryState::Complete(file) => return Ok(Wait::Found(file)),
                DirectoryState::Missing => return Ok(Wait::DirectoryGone),
                DirectoryState::InProgress(file) => {
                    trace!(file = %file.display(), "Download still in progress");
                }
                DirectoryState::Empty => {}
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn cleanup(&self, session: DownloadSession) {
        let id = session.id().to_string();
        let directory = session.directory().to_path_buf();
        match session.teardown().await {
            Ok(()) => debug!(session = %id, "Removed download directory"),
            Err(e) => {
                self.metrics.cleanup_failed();
                warn!(
                    session = %id,
                    path = %directory.display(),
                    error = %e,
                    "Failed to remove download directory"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::RecordingChannel;
    use crate::channel::pipe;
    use tempfile::TempDir;

    fn session_in(temp: &TempDir) -> DownloadSession {
        let directory = temp.path().join(".dlrelay.download.unit");
        std::fs::create_dir(&directory).unwrap();
        DownloadSession::new("unit".to_string(), directory)
    }

    fn watcher(metrics: &Arc<RelayMetrics>) -> DownloadCompletionWatcher {
        DownloadCompletionWatcher::new(ResponseStreamer::default().with_metrics(metrics.clone()))
            .with_poll_interval(Duration::from_millis(10))
            .with_poll_timeout(Duration::from_secs(5))
            .with_metrics(metrics.clone())
    }

    #[tokio::test]
    async fn test_delivers_completed_file_whole() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("report.pdf"), b"%PDF-1.7").unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let (mut response, body) = pipe(4);
        let outcome = watcher(&metrics)
            .await_and_deliver(session, &mut response, &RequestMeta::new())
            .await
            .unwrap();

        match outcome {
            WatchOutcome::Delivered(report) => {
                assert_eq!(report.mode, TransferMode::WholeFile);
                assert_eq!(report.path, directory.join("report.pdf"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(body.collect().await.unwrap(), b"%PDF-1.7");
        assert!(!directory.exists());
        assert_eq!(metrics.snapshot().deliveries, 1);
    }

    #[tokio::test]
    async fn test_delivers_chunked_when_requested() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("capture.webm"), b"webm-bytes").unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let (mut response, body) = pipe(4);
        let request = RequestMeta::new().with_transfer_encoding("chunked");
        let outcome = watcher(&metrics)
            .await_and_deliver(session, &mut response, &request)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WatchOutcome::Delivered(DeliveryReport {
                mode: TransferMode::Chunked,
                bytes: 10,
                ..
            })
        ));
        assert_eq!(body.content_type().as_deref(), Some("application/octet-stream"));
        assert_eq!(body.collect().await.unwrap(), b"webm-bytes");
        assert!(!directory.exists());
    }

    #[tokio::test]
    async fn test_waits_while_partial() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        let partial = directory.join("report.pdf.crdownload");
        std::fs::write(&partial, b"%PDF-1.7").unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let rename_from = partial.clone();
        let rename_to = directory.join("report.pdf");
        let renamer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            std::fs::rename(rename_from, rename_to).unwrap();
        });

        let mut channel = RecordingChannel::new();
        let outcome = watcher(&metrics)
            .await_and_deliver(session, &mut channel, &RequestMeta::new())
            .await
            .unwrap();
        renamer.await.unwrap();

        match outcome {
            WatchOutcome::Delivered(report) => {
                assert_eq!(report.path, directory.join("report.pdf"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!directory.exists());
    }

    #[tokio::test]
    async fn test_skips_when_headers_already_sent() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("report.pdf"), b"%PDF").unwrap();
        let metrics = Arc::new(RelayMetrics::new());
        let mut channel = RecordingChannel {
            committed: true,
            ..Default::default()
        };

        let outcome = watcher(&metrics)
            .await_and_deliver(session, &mut channel, &RequestMeta::new())
            .await
            .unwrap();

        assert_eq!(outcome, WatchOutcome::Skipped(SkipReason::HeadersSent));
        assert!(channel.events.is_empty());
        assert!(!directory.exists());
        assert_eq!(metrics.snapshot().skipped, 1);
    }

    #[tokio::test]
    async fn test_commit_during_polling_stops_loop() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        let metrics = Arc::new(RelayMetrics::new());

        let (mut response, body) = pipe(4);
        let handle = body.commit_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.commit();
        });

        let outcome = watcher(&metrics)
            .await_and_deliver(session, &mut response, &RequestMeta::new())
            .await
            .unwrap();

        assert_eq!(outcome, WatchOutcome::Skipped(SkipReason::HeadersSent));
        assert!(!directory.exists());
    }

    #[tokio::test]
    async fn test_timeout_cleans_up() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("stuck.zip.crdownload"), b"PK").unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let mut channel = RecordingChannel::new();
        let err = watcher(&metrics)
            .with_poll_timeout(Duration::from_millis(100))
            .await_and_deliver(session, &mut channel, &RequestMeta::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::PollTimeout { .. }));
        assert!(!directory.exists());
        assert!(channel.events.is_empty());
        assert_eq!(metrics.snapshot().timeouts, 1);
    }

    #[tokio::test]
    async fn test_stream_failure_still_cleans_up() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("capture.webm"), b"webm").unwrap();
        let metrics = Arc::new(RelayMetrics::new());
        let mut channel = RecordingChannel {
            fail_writes_after: Some(0),
            ..Default::default()
        };

        let request = RequestMeta::new().with_transfer_encoding("chunked");
        let err = watcher(&metrics)
            .await_and_deliver(session, &mut channel, &request)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::StreamDelivery { .. }));
        assert!(!directory.exists());
        assert_eq!(metrics.snapshot().stream_failures, 1);
    }

    #[tokio::test]
    async fn test_whole_file_failure_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("report.pdf"), b"%PDF").unwrap();
        let metrics = Arc::new(RelayMetrics::new());
        let mut channel = RecordingChannel {
            fail_send_file: true,
            ..Default::default()
        };

        let outcome = watcher(&metrics)
            .await_and_deliver(session, &mut channel, &RequestMeta::new())
            .await
            .unwrap();

        match outcome {
            WatchOutcome::Delivered(report) => assert!(!report.is_success()),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!directory.exists());
    }

    #[tokio::test]
    async fn test_first_file_wins() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("a.csv"), b"first").unwrap();
        std::fs::write(directory.join("b.csv"), b"second").unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let (mut response, body) = pipe(4);
        watcher(&metrics)
            .await_and_deliver(session, &mut response, &RequestMeta::new())
            .await
            .unwrap();

        assert_eq!(body.collect().await.unwrap(), b"first");
        assert!(!directory.exists());
    }

    #[tokio::test]
    async fn test_removed_directory_is_no_file() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        std::fs::remove_dir(session.directory()).unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let mut channel = RecordingChannel::new();
        let outcome = watcher(&metrics)
            .await_and_deliver(session, &mut channel, &RequestMeta::new())
            .await
            .unwrap();

        assert_eq!(outcome, WatchOutcome::Skipped(SkipReason::NoFile));
        assert_eq!(metrics.snapshot().cleanup_failures, 0);
    }

    #[tokio::test]
    async fn test_scan_error_is_counted() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        // A regular file in place of the directory fails the listing
        std::fs::remove_dir(session.directory()).unwrap();
        std::fs::write(session.directory(), b"not a directory").unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let mut channel = RecordingChannel::new();
        let err = watcher(&metrics)
            .await_and_deliver(session, &mut channel, &RequestMeta::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Io(_)));
        assert!(channel.events.is_empty());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.io_failures, 1);
        assert_eq!(snapshot.timeouts, 0);
        assert_eq!(snapshot.sessions_finished(), 1);
    }

    #[tokio::test]
    async fn test_empty_partial_suffix_is_ignored() {
        let temp = TempDir::new().unwrap();
        let session = session_in(&temp);
        let directory = session.directory().to_path_buf();
        std::fs::write(directory.join("report.pdf.crdownload"), b"half").unwrap();
        let metrics = Arc::new(RelayMetrics::new());

        let mut channel = RecordingChannel::new();
        let err = watcher(&metrics)
            .with_partial_suffix("")
            .with_poll_timeout(Duration::from_millis(100))
            .await_and_deliver(session, &mut channel, &RequestMeta::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::PollTimeout { .. }));
        assert!(channel.events.is_empty());
        assert!(!directory.exists());
    }
}
