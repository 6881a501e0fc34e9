//! Error types for download staging, watching, and delivery.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::browser::BrowserError;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while relaying a browser download.
///
/// Errors raised before any body bytes reach the client (`DirectoryCreation`,
/// `BrowserConfiguration`, `PollTimeout`) can still be turned into an HTTP
/// error response by the caller. `StreamDelivery` happens after the response
/// has been committed and can only be recorded.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The session directory could not be created inside the workspace root.
    #[error("failed to create download directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The browser refused or could not apply the download behavior.
    #[error("failed to configure browser downloads: {0}")]
    BrowserConfiguration(#[from] BrowserError),

    /// No completed file appeared before the poll deadline.
    #[error(
        "no completed download in {} after {}ms",
        directory.display(),
        waited.as_millis()
    )]
    PollTimeout { directory: PathBuf, waited: Duration },

    /// Chunked streaming failed after the response had begun.
    #[error("failed to stream {} to the client: {source}", path.display())]
    StreamDelivery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Whole-file transfer failed. Reported through `DeliveryReport`, not raised.
    #[error("failed to send {} to the client: {reason}", path.display())]
    WholeFileDelivery { path: PathBuf, reason: String },

    /// Filesystem error while scanning a session directory.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RelayError {
    /// Whether the error happened before any body bytes were sent.
    ///
    /// Callers use this to decide whether an HTTP error status can still be
    /// returned to the client.
    pub fn is_before_response(&self) -> bool {
        !matches!(
            self,
            Self::StreamDelivery { .. } | Self::WholeFileDelivery { .. }
        )
    }
}
