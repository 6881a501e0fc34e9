//! Creates session directories and points the browser at them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::DownloadSession;
use crate::browser::{DownloadBehavior, DownloadBehaviorControl};
use crate::error::{RelayError, RelayResult};
use crate::telemetry::RelayMetrics;

/// Stages isolated download directories under a workspace root.
#[derive(Debug, Clone)]
pub struct SessionStager {
    workspace_root: PathBuf,
    prefix: String,
    metrics: Arc<RelayMetrics>,
}

impl SessionStager {
    /// Create a stager for an existing workspace root.
    pub fn new(workspace_root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            prefix: prefix.into(),
            metrics: Arc::new(RelayMetrics::new()),
        }
    }

    /// Record staging outcomes in shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Create a fresh session directory and bind the browser's downloads to it.
    ///
    /// Directory creation strictly precedes the browser call. If the browser
    /// rejects the setting, the new directory is removed before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `DirectoryCreation` if the workspace root is missing or unwritable,
    ///   or the directory already exists.
    /// - `BrowserConfiguration` if the browser cannot apply the behavior.
    pub async fn stage<B>(&self, browser: &B) -> RelayResult<DownloadSession>
    where
        B: DownloadBehaviorControl + ?Sized,
    {
        // The browser needs an absolute path
        let root = tokio::fs::canonicalize(&self.workspace_root)
            .await
            .map_err(|source| {
                self.metrics.staging_failed();
                RelayError::DirectoryCreation {
                    path: self.workspace_root.clone(),
                    source,
                }
            })?;

        let id = Uuid::new_v4().simple().to_string();
        let directory = root.join(format!("{}{}", self.prefix, id));

        if let Err(source) = tokio::fs::create_dir(&directory).await {
            self.metrics.staging_failed();
            return Err(RelayError::DirectoryCreation {
                path: directory,
                source,
            });
        }

        let session = DownloadSession::new(id, directory);

        if let Err(e) = browser
            .set_download_behavior(DownloadBehavior::Allow, session.directory())
            .await
        {
            self.metrics.staging_failed();
            warn!(session = %session.id(), error = %e, "Browser rejected download behavior");
            let path = session.directory().to_path_buf();
            if let Err(cleanup) = session.teardown().await {
                self.metrics.cleanup_failed();
                warn!(path = %path.display(), error = %cleanup, "Failed to remove download directory");
            }
            return Err(RelayError::BrowserConfiguration(e));
        }

        self.metrics.session_staged();
        info!(
            session = %session.id(),
            path = %session.directory().display(),
            "Download session staged"
        );
        Ok(session)
    }
}
