//! Removal of session directories left behind by crashed or killed processes.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use glob::Pattern;
use tracing::{debug, warn};

/// Result of a sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Directories removed.
    pub removed: Vec<PathBuf>,
    /// Directories that matched but could not be removed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Directories that matched but were younger than the minimum age.
    pub skipped_recent: usize,
}

/// Remove session directories under `root` older than `min_age`.
///
/// Only directories whose name starts with `prefix` are considered. Pass a
/// `min_age` larger than the poll timeout to avoid touching live sessions.
pub async fn sweep_stale_sessions(
    root: &Path,
    prefix: &str,
    min_age: Duration,
) -> io::Result<SweepReport> {
    let pattern = format!(
        "{}/{}*",
        Pattern::escape(&root.to_string_lossy()),
        Pattern::escape(prefix)
    );
    let candidates =
        glob::glob(&pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let now = SystemTime::now();
    let mut report = SweepReport::default();

    for candidate in candidates {
        let path = match candidate {
            Ok(path) => path,
            Err(e) => {
                report.failed.push((e.path().to_path_buf(), e.error().to_string()));
                continue;
            }
        };

        let metadata = match tokio::fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => metadata,
            Ok(_) => continue,
            Err(e) => {
                report.failed.push((path, e.to_string()));
                continue;
            }
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < min_age {
            report.skipped_recent += 1;
            continue;
        }

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stale download directory");
                report.removed.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove stale download directory");
                report.failed.push((path, e.to_string()));
            }
        }
    }

    Ok(report)
}
