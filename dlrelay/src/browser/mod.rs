//! Browser download-behavior capability.
//!
//! The relay never drives the browser itself beyond one call: telling the
//! session where downloads should land. That call is expressed by the
//! [`DownloadBehaviorControl`] trait so the stager works against any
//! automation backend. [`CdpClient`] implements it over the Chrome DevTools
//! Protocol.
//!
//! # Example
//!
//! ```ignore
//! use dlrelay::browser::{CdpClient, DownloadBehavior, DownloadBehaviorControl};
//!
//! let client = CdpClient::connect("ws://127.0.0.1:9222/devtools/page/ABC").await?;
//! client
//!     .set_download_behavior(DownloadBehavior::Allow, Path::new("/tmp/downloads"))
//!     .await?;
//! ```

mod cdp;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::BoxFuture;

pub use cdp::{CdpClient, DEFAULT_COMMAND_TIMEOUT};

/// Whether the browser may write downloads to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadBehavior {
    /// Downloads are written to the configured directory.
    Allow,
    /// Downloads are refused.
    Deny,
}

impl DownloadBehavior {
    /// Protocol string for this behavior.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for DownloadBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a browser session.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Could not open the DevTools connection.
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The browser answered a command with an error.
    #[error("{method} rejected ({code}): {message}")]
    Rejected {
        method: String,
        code: i64,
        message: String,
    },

    /// The session closed before a response arrived.
    #[error("browser session closed")]
    Closed,

    /// No response arrived within the command timeout.
    #[error("{method} timed out after {}ms", timeout.as_millis())]
    Timeout { method: String, timeout: Duration },

    /// Transport-level failure.
    #[error("websocket error: {0}")]
    Transport(String),

    /// A message could not be encoded or decoded.
    #[error("malformed protocol message: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The download path cannot be expressed as a protocol string.
    #[error("download path is not valid UTF-8: {0}")]
    InvalidPath(String),
}

/// Capability to bind a browser session's downloads to a directory.
///
/// The setting applies immediately and for the remaining life of the session.
pub trait DownloadBehaviorControl: Send + Sync {
    /// Set the download behavior and target directory.
    fn set_download_behavior<'a>(
        &'a self,
        behavior: DownloadBehavior,
        download_path: &'a Path,
    ) -> BoxFuture<'a, Result<(), BrowserError>>;
}
