//! Clean command - remove stale session directories.

use std::path::PathBuf;
use std::time::Duration;

use dlrelay::DownloadRelay;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the clean command.
pub struct CleanArgs {
    pub min_age: Option<u64>,
    pub workspace: Option<PathBuf>,
}

/// Run the clean command.
pub fn run(args: CleanArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("clean");

    let mut relay_config = runner.config().to_relay_config();
    if let Some(workspace) = args.workspace {
        relay_config.workspace_root = workspace;
    }

    // Anything younger than two poll deadlines may still belong to a live fetch
    let min_age = args
        .min_age
        .map(Duration::from_secs)
        .unwrap_or(relay_config.poll_timeout * 2);

    println!(
        "Sweeping {} (older than {}s)",
        relay_config.workspace_root.display(),
        min_age.as_secs()
    );

    let relay = DownloadRelay::new(relay_config);
    let report = runner.runtime()?.block_on(relay.sweep_stale(min_age))?;

    println!("  Removed: {}", report.removed.len());
    println!("  Kept (recent): {}", report.skipped_recent);

    if report.failed.is_empty() {
        return Ok(());
    }

    for (path, reason) in &report.failed {
        println!("  Failed: {} ({})", path.display(), reason);
    }
    Err(CliError::Clean(format!(
        "{} directories could not be removed",
        report.failed.len()
    )))
}
