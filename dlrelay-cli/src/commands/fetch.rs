//! Fetch command - download a URL through the browser.
//!
//! ```text
//! CdpClient ──setDownloadBehavior──► session dir ◄── Chrome writes file
//!     │
//!     └─navigate(url)
//!
//! DownloadRelay::await_and_deliver ──► PipeResponse ══► ResponseBody ──► file / stdout
//!                                           ▲
//!                           Ctrl-C ── CommitHandle::commit()
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dlrelay::browser::CdpClient;
use dlrelay::channel::{pipe, RequestMeta, ResponseBody, DEFAULT_PIPE_CAPACITY};
use dlrelay::config::RelayConfig;
use dlrelay::watcher::{SkipReason, WatchOutcome};
use dlrelay::DownloadRelay;
use futures::StreamExt;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub url: String,
    pub cdp: Option<String>,
    pub output: Option<PathBuf>,
    pub chunked: bool,
    pub timeout: Option<u64>,
    pub workspace: Option<PathBuf>,
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("fetch");
    let config = runner.config();

    // CLI > config
    let cdp_url = args
        .cdp
        .or_else(|| config.browser.cdp_url.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No DevTools endpoint. Set browser.cdp_url in config.ini or use --cdp."
                    .to_string(),
            )
        })?;

    let mut relay_config = config.to_relay_config();
    if let Some(workspace) = args.workspace {
        relay_config.workspace_root = workspace;
    }
    if let Some(secs) = args.timeout {
        relay_config = relay_config.with_poll_timeout(Duration::from_secs(secs));
    }

    let job = FetchJob {
        url: args.url,
        cdp_url,
        command_timeout: config.command_timeout(),
        relay_config,
        output: args.output,
        chunked: args.chunked,
    };

    runner.runtime()?.block_on(job.run())
}

struct FetchJob {
    url: String,
    cdp_url: String,
    command_timeout: Duration,
    relay_config: RelayConfig,
    output: Option<PathBuf>,
    chunked: bool,
}

impl FetchJob {
    async fn run(self) -> Result<(), CliError> {
        let relay = DownloadRelay::new(self.relay_config);
        let browser = CdpClient::connect(&self.cdp_url)
            .await?
            .with_command_timeout(self.command_timeout);

        let session = relay.stage(&browser).await?;

        let (mut response, body) = pipe(DEFAULT_PIPE_CAPACITY);
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let cancelled = cancelled.clone();
            let handle = body.commit_handle();
            ctrlc::set_handler(move || {
                eprintln!();
                eprintln!("Received interrupt, giving up on the download...");
                cancelled.store(true, Ordering::SeqCst);
                handle.commit();
            })
            .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;
        }

        if let Err(e) = browser.navigate(&self.url).await {
            if let Err(cleanup) = session.teardown().await {
                warn!(error = %cleanup, "Failed to remove download directory");
            }
            return Err(e.into());
        }

        let progress = spinner(&self.url);
        let request = if self.chunked {
            RequestMeta::new().with_transfer_encoding("chunked")
        } else {
            RequestMeta::new()
        };

        let deliver = async {
            let outcome = relay
                .await_and_deliver(session, &mut response, &request)
                .await;
            // Ends the body stream for the writer
            drop(response);
            outcome
        };
        let (outcome, written) =
            tokio::join!(deliver, write_body(body, self.output.as_deref(), progress.clone()));
        progress.finish_and_clear();

        if let Err(e) = browser.close().await {
            debug!(error = %e, "DevTools socket did not close cleanly");
        }
        debug!(metrics = %relay.snapshot(), "Fetch finished");

        // A writer failure is the root cause of any delivery failure that follows
        let written = written?;
        match outcome? {
            WatchOutcome::Delivered(report) => {
                let path = report.path.clone();
                report.into_result()?;
                info!(file = %path.display(), bytes = written, "Download relayed");
                eprintln!(
                    "Fetched {} ({})",
                    file_label(&path),
                    HumanBytes(written)
                );
                if let Some(output) = &self.output {
                    eprintln!("Saved to {}", output.display());
                }
                Ok(())
            }
            WatchOutcome::Skipped(_) if cancelled.load(Ordering::SeqCst) => {
                Err(CliError::Cancelled)
            }
            WatchOutcome::Skipped(SkipReason::HeadersSent) => Err(CliError::NotDelivered(
                "output closed before the download finished".to_string(),
            )),
            WatchOutcome::Skipped(SkipReason::NoFile) => Err(CliError::NotDelivered(
                "download directory disappeared".to_string(),
            )),
        }
    }
}

fn spinner(url: &str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(format!("Waiting for {}", url));
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn open_sink(output: Option<&Path>) -> Result<Box<dyn AsyncWrite + Unpin + Send>, CliError> {
    match output {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .map_err(|source| CliError::Output {
                    path: Some(path.to_path_buf()),
                    source,
                })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Copy the response body to `output` (stdout when `None`).
///
/// The output is only opened once the first chunk arrives, so a fetch that
/// delivers nothing leaves no empty file behind.
async fn write_body(
    mut body: ResponseBody,
    output: Option<&Path>,
    progress: ProgressBar,
) -> Result<u64, CliError> {
    let output_err = |source| CliError::Output {
        path: output.map(Path::to_path_buf),
        source,
    };

    let mut sink = None;
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(CliError::Transfer)?;
        if sink.is_none() {
            sink = Some(open_sink(output).await?);
        }
        if let Some(sink) = sink.as_mut() {
            sink.write_all(&chunk).await.map_err(output_err)?;
        }
        written += chunk.len() as u64;
        progress.set_message(format!("Received {}", HumanBytes(written)));
    }

    if let Some(mut sink) = sink {
        sink.flush().await.map_err(output_err)?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use dlrelay::channel::ResponseChannel;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_body_to_file() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("report.pdf");
        let (mut response, body) = pipe(4);

        let writer = tokio::spawn({
            let output = output.clone();
            async move { write_body(body, Some(&output), ProgressBar::hidden()).await }
        });
        response.write_chunk(Bytes::from_static(b"%PDF")).await.unwrap();
        response.write_chunk(Bytes::from_static(b"-1.7")).await.unwrap();
        response.finish().await.unwrap();

        assert_eq!(writer.await.unwrap().unwrap(), 8);
        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_write_body_empty_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("never.bin");
        let (response, body) = pipe(4);
        drop(response);

        let written = write_body(body, Some(&output), ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_write_body_reports_abort() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("capture.webm");
        let (mut response, body) = pipe(4);

        response.write_chunk(Bytes::from_static(b"webm")).await.unwrap();
        response
            .abort(std::io::Error::new(std::io::ErrorKind::Other, "disk read failed"))
            .await;
        drop(response);

        let err = write_body(body, Some(&output), ProgressBar::hidden())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Transfer(_)));
    }
}
