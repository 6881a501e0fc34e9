//! Runtime settings for staging, watching and delivery.

use std::path::PathBuf;
use std::time::Duration;

/// Name prefix of every session directory.
pub const DEFAULT_SESSION_PREFIX: &str = ".dlrelay.download.";

/// Suffix Chromium gives a download while it is still being written.
pub const DEFAULT_PARTIAL_SUFFIX: &str = ".crdownload";

/// Delay between two directory checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Upper bound on how long a session waits for its download.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 120;

/// Content type announced for chunked deliveries.
pub const DEFAULT_CHUNKED_CONTENT_TYPE: &str = "application/octet-stream";

/// Read size used when streaming a file (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Settings shared by [`SessionStager`](crate::session::SessionStager),
/// [`DownloadCompletionWatcher`](crate::watcher::DownloadCompletionWatcher)
/// and [`ResponseStreamer`](crate::delivery::ResponseStreamer).
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Existing, writable directory that holds session directories.
    ///
    /// Never created by the relay.
    pub workspace_root: PathBuf,

    /// Prefix of session directory names.
    pub session_prefix: String,

    /// File name suffix marking an in-progress download.
    pub partial_suffix: String,

    /// Delay between directory checks.
    pub poll_interval: Duration,

    /// Deadline for a completed file to appear.
    pub poll_timeout: Duration,

    /// Content type set on chunked responses.
    pub chunked_content_type: String,

    /// Read size for streaming.
    pub chunk_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir(),
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            partial_suffix: DEFAULT_PARTIAL_SUFFIX.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            chunked_content_type: DEFAULT_CHUNKED_CONTENT_TYPE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl RelayConfig {
    /// Create a configuration rooted at the given workspace directory.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Default::default()
        }
    }

    /// Set the session directory prefix.
    pub fn with_session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.session_prefix = prefix.into();
        self
    }

    /// Set the partial-download suffix. An empty suffix is ignored.
    pub fn with_partial_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        if !suffix.is_empty() {
            self.partial_suffix = suffix;
        }
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the poll deadline.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the chunked content type.
    pub fn with_chunked_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.chunked_content_type = content_type.into();
        self
    }

    /// Set the streaming read size. Zero is raised to one byte.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}
