//! Snapshot of a session directory.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

/// What one look at the session directory found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DirectoryState {
    /// Nothing written yet.
    Empty,
    /// The first entry is still being written.
    InProgress(PathBuf),
    /// The first entry is finished.
    Complete(PathBuf),
    /// The directory no longer exists.
    Missing,
}

/// Whether `name` carries the partial-download marker.
pub fn is_partial(name: &OsStr, partial_suffix: &str) -> bool {
    name.to_string_lossy().ends_with(partial_suffix)
}

/// Classify the directory by its first entry in file-name order.
///
/// Only the first entry is considered; any others are ignored.
pub(crate) async fn scan(directory: &Path, partial_suffix: &str) -> io::Result<DirectoryState> {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DirectoryState::Missing),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name());
    }
    names.sort();

    Ok(match names.first() {
        None => DirectoryState::Empty,
        Some(name) if is_partial(name, partial_suffix) => {
            DirectoryState::InProgress(directory.join(name))
        }
        Some(name) => DirectoryState::Complete(directory.join(name)),
    })
}
