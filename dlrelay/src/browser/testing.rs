//! In-memory browser stand-in for unit tests.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{BrowserError, DownloadBehavior, DownloadBehaviorControl};
use crate::BoxFuture;

/// Records every download-behavior call, optionally rejecting them.
#[derive(Default)]
pub(crate) struct RecordingBrowser {
    calls: Mutex<Vec<(DownloadBehavior, PathBuf, bool)>>,
    fail: bool,
}

impl RecordingBrowser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<(DownloadBehavior, PathBuf)> {
        self.calls
            .lock()
            .iter()
            .map(|(behavior, path, _)| (*behavior, path.clone()))
            .collect()
    }

    /// Whether the target directory existed at the time of each call.
    pub(crate) fn directories_existed(&self) -> Vec<bool> {
        self.calls.lock().iter().map(|(_, _, existed)| *existed).collect()
    }
}

impl DownloadBehaviorControl for RecordingBrowser {
    fn set_download_behavior<'a>(
        &'a self,
        behavior: DownloadBehavior,
        download_path: &'a Path,
    ) -> BoxFuture<'a, Result<(), BrowserError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .push((behavior, download_path.to_path_buf(), download_path.is_dir()));
            if self.fail {
                return Err(BrowserError::Closed);
            }
            Ok(())
        })
    }
}
