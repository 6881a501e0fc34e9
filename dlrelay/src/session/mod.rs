//! Per-session download directories.
//!
//! A [`DownloadSession`] owns one directory inside the workspace root for the
//! lifetime of a single browser download. [`SessionStager`] creates it and
//! binds the browser to it; the watcher tears it down.
//!
//! # Lifecycle
//!
//! ```text
//! stage() ──► mkdir <root>/<prefix><uuid> ──► Page.setDownloadBehavior(allow, dir)
//!                                                        │
//!                          watcher polls, delivers ◄─────┘
//!                                    │
//!                               teardown() ──► rm -r dir
//! ```

mod stager;
mod sweep;

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

pub use stager::SessionStager;
pub use sweep::{sweep_stale_sessions, SweepReport};

/// Handle to a staged download directory.
///
/// The directory exists from staging until [`teardown`](Self::teardown).
/// If the handle is dropped without teardown (for instance when the owning
/// future is cancelled), the directory is removed on drop.
///
/// That fallback calls the blocking `std::fs::remove_dir_all` on the
/// dropping thread, which stalls an async worker for as long as the removal
/// takes. Prefer [`teardown`](Self::teardown) on every normal path.
#[derive(Debug)]
pub struct DownloadSession {
    id: String,
    directory: PathBuf,
    active: bool,
}

impl DownloadSession {
    pub(crate) fn new(id: String, directory: PathBuf) -> Self {
        Self {
            id,
            directory,
            active: true,
        }
    }

    /// Opaque unique token of this session.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute path of the session directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Remove the session directory and everything in it.
    ///
    /// A directory that is already gone counts as removed.
    pub async fn teardown(mut self) -> io::Result<()> {
        let result = remove_dir_if_present(&self.directory).await;
        self.active = false;
        result
    }
}

impl Drop for DownloadSession {
    // Blocking; see the type docs
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.directory) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    session = %self.id,
                    path = %self.directory.display(),
                    error = %e,
                    "Failed to remove abandoned download directory"
                );
            }
        }
    }
}

pub(crate) async fn remove_dir_if_present(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
