//! Writes a completed file to a response channel.

use std::io;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::{DeliveryReport, TransferMode};
use crate::channel::ResponseChannel;
use crate::config::{DEFAULT_CHUNKED_CONTENT_TYPE, DEFAULT_CHUNK_SIZE};
use crate::error::{RelayError, RelayResult};
use crate::telemetry::RelayMetrics;

/// Delivers files in either transfer mode.
#[derive(Debug, Clone)]
pub struct ResponseStreamer {
    content_type: String,
    chunk_size: usize,
    metrics: Arc<RelayMetrics>,
}

impl Default for ResponseStreamer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNKED_CONTENT_TYPE, DEFAULT_CHUNK_SIZE)
    }
}

impl ResponseStreamer {
    /// Create a streamer announcing `content_type` on chunked responses.
    pub fn new(content_type: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            content_type: content_type.into(),
            chunk_size: chunk_size.max(1),
            metrics: Arc::new(RelayMetrics::new()),
        }
    }

    /// Record delivery outcomes in shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Deliver `path` on `channel`.
    ///
    /// The transfer always completes before any post-transfer cleanup.
    ///
    /// # Errors
    ///
    /// Only chunked mode returns errors: `Io` if the file cannot be opened
    /// (nothing has been written yet), `StreamDelivery` if reading or writing
    /// fails mid-stream. Whole-file failures are recorded in the report.
    pub async fn deliver<C>(
        &self,
        path: &Path,
        channel: &mut C,
        mode: TransferMode,
    ) -> RelayResult<DeliveryReport>
    where
        C: ResponseChannel + ?Sized,
    {
        match mode {
            TransferMode::Chunked => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    self.metrics.io_failed();
                    warn!(path = %path.display(), error = %e, "Failed to open downloaded file");
                    RelayError::Io(e)
                })?;
                channel.set_content_type(&self.content_type);
                self.stream(path, file, channel).await
            }
            TransferMode::WholeFile => Ok(self.send_whole_file(path, channel).await),
        }
    }

    /// Pipe `reader` to the channel chunk by chunk, then finish the response.
    ///
    /// On the first read or write error the body is aborted and nothing more
    /// is written.
    pub(crate) async fn stream<R, C>(
        &self,
        path: &Path,
        reader: R,
        channel: &mut C,
    ) -> RelayResult<DeliveryReport>
    where
        R: AsyncRead + Unpin + Send,
        C: ResponseChannel + ?Sized,
    {
        let mut chunks = ReaderStream::with_capacity(reader, self.chunk_size);
        let mut bytes = 0u64;

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Err(self.abort(path, channel, e).await),
            };
            let len = chunk.len() as u64;
            if let Err(e) = channel.write_chunk(chunk).await {
                return Err(self.abort(path, channel, e).await);
            }
            bytes += len;
        }

        if let Err(e) = channel.finish().await {
            return Err(self.abort(path, channel, e).await);
        }

        self.metrics.delivered(bytes);
        debug!(path = %path.display(), bytes, "File streamed successfully");

        Ok(DeliveryReport {
            path: path.to_path_buf(),
            mode: TransferMode::Chunked,
            bytes,
            failure: None,
        })
    }

    async fn abort<C>(&self, path: &Path, channel: &mut C, error: io::Error) -> RelayError
    where
        C: ResponseChannel + ?Sized,
    {
        warn!(path = %path.display(), error = %error, "Error streaming file back");
        self.metrics.stream_failed();
        channel
            .abort(io::Error::new(error.kind(), error.to_string()))
            .await;
        RelayError::StreamDelivery {
            path: path.to_path_buf(),
            source: error,
        }
    }

    async fn send_whole_file<C>(&self, path: &Path, channel: &mut C) -> DeliveryReport
    where
        C: ResponseChannel + ?Sized,
    {
        let (bytes, failure) = match channel.send_file(path).await {
            Ok(bytes) => {
                self.metrics.delivered(bytes);
                debug!(path = %path.display(), bytes, "File sent successfully");
                (bytes, None)
            }
            Err(e) => {
                self.metrics.send_failed();
                warn!(path = %path.display(), error = %e, "Error sending file back");
                (0, Some(e.to_string()))
            }
        };

        // The file is single-use
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != io::ErrorKind::NotFound {
                self.metrics.cleanup_failed();
                warn!(path = %path.display(), error = %e, "Failed to remove delivered file");
            }
        }

        DeliveryReport {
            path: path.to_path_buf(),
            mode: TransferMode::WholeFile,
            bytes,
            failure,
        }
    }
}
