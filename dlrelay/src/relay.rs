//! Relay facade.
//!
//! `DownloadRelay` owns one [`SessionStager`] and one
//! [`DownloadCompletionWatcher`] built from a [`RelayConfig`], sharing a
//! single [`RelayMetrics`]. It is cheap to clone and safe to share across
//! concurrent requests; each request gets its own [`DownloadSession`].
//!
//! # Example
//!
//! ```ignore
//! let relay = DownloadRelay::new(RelayConfig::new("/var/tmp/dlrelay"));
//! let session = relay.stage(&browser).await?;
//! browser.navigate(url).await?;
//! let outcome = relay.await_and_deliver(session, &mut response, &request).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::browser::DownloadBehaviorControl;
use crate::channel::{RequestMeta, ResponseChannel};
use crate::config::RelayConfig;
use crate::delivery::ResponseStreamer;
use crate::error::RelayResult;
use crate::session::{sweep_stale_sessions, DownloadSession, SessionStager, SweepReport};
use crate::telemetry::{RelayMetrics, TelemetrySnapshot};
use crate::watcher::{DownloadCompletionWatcher, WatchOutcome};

/// Stages download sessions and delivers their results.
#[derive(Debug, Clone)]
pub struct DownloadRelay {
    config: RelayConfig,
    stager: SessionStager,
    watcher: DownloadCompletionWatcher,
    metrics: Arc<RelayMetrics>,
}

impl DownloadRelay {
    pub fn new(config: RelayConfig) -> Self {
        let metrics = Arc::new(RelayMetrics::new());

        let stager = SessionStager::new(&config.workspace_root, &config.session_prefix)
            .with_metrics(Arc::clone(&metrics));

        let streamer = ResponseStreamer::new(&config.chunked_content_type, config.chunk_size)
            .with_metrics(Arc::clone(&metrics));

        let watcher = DownloadCompletionWatcher::new(streamer)
            .with_poll_interval(config.poll_interval)
            .with_poll_timeout(config.poll_timeout)
            .with_partial_suffix(&config.partial_suffix)
            .with_metrics(Arc::clone(&metrics));

        Self {
            config,
            stager,
            watcher,
            metrics,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn watcher(&self) -> &DownloadCompletionWatcher {
        &self.watcher
    }

    /// Shared counters for every session this relay handled.
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.metrics.snapshot()
    }

    /// Create a session directory and point `browser` at it.
    ///
    /// See [`SessionStager::stage`].
    pub async fn stage<B>(&self, browser: &B) -> RelayResult<DownloadSession>
    where
        B: DownloadBehaviorControl + ?Sized,
    {
        self.stager.stage(browser).await
    }

    /// Wait for the session's download and deliver it on `channel`.
    ///
    /// See [`DownloadCompletionWatcher::await_and_deliver`].
    pub async fn await_and_deliver<C>(
        &self,
        session: DownloadSession,
        channel: &mut C,
        request: &RequestMeta,
    ) -> RelayResult<WatchOutcome>
    where
        C: ResponseChannel + ?Sized,
    {
        self.watcher
            .await_and_deliver(session, channel, request)
            .await
    }

    /// Remove session directories older than `min_age` left by earlier runs.
    pub async fn sweep_stale(&self, min_age: Duration) -> RelayResult<SweepReport> {
        let report = sweep_stale_sessions(
            &self.config.workspace_root,
            &self.config.session_prefix,
            min_age,
        )
        .await?;

        info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            skipped_recent = report.skipped_recent,
            "Swept stale download directories"
        );
        Ok(report)
    }
}
