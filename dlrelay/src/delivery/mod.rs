//! Delivery of a completed download to the client.
//!
//! The transfer mode is chosen once per request from its metadata:
//!
//! - [`TransferMode::Chunked`] when the request declared chunked transfer
//!   coding. The file is piped chunk by chunk under a fixed binary content
//!   type; a failure aborts the body and is returned to the caller.
//! - [`TransferMode::WholeFile`] otherwise. The file is handed to the
//!   channel's file-send and removed afterwards whatever the outcome.

mod streamer;

use std::fmt;
use std::path::PathBuf;

use crate::channel::RequestMeta;
use crate::error::{RelayError, RelayResult};

pub use streamer::ResponseStreamer;

/// How a file is written to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Incremental byte stream without a known length.
    Chunked,
    /// The finished file as a single response body.
    WholeFile,
}

impl TransferMode {
    /// Select the mode for a request.
    pub fn from_request(request: &RequestMeta) -> Self {
        if request.is_chunked() {
            Self::Chunked
        } else {
            Self::WholeFile
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chunked => "chunked",
            Self::WholeFile => "whole-file",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when a file was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// File that was delivered.
    pub path: PathBuf,
    /// Mode used.
    pub mode: TransferMode,
    /// Bytes handed to the channel.
    pub bytes: u64,
    /// Whole-file send failure, recorded instead of raised.
    pub failure: Option<String>,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Convert a recorded failure into an error.
    pub fn into_result(self) -> RelayResult<u64> {
        match self.failure {
            None => Ok(self.bytes),
            Some(reason) => Err(RelayError::WholeFileDelivery {
                path: self.path,
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_request() {
        let chunked = RequestMeta::new().with_transfer_encoding("chunked");
        assert_eq!(TransferMode::from_request(&chunked), TransferMode::Chunked);
        assert_eq!(
            TransferMode::from_request(&RequestMeta::new()),
            TransferMode::WholeFile
        );
    }

    #[test]
    fn test_report_into_result() {
        let ok = DeliveryReport {
            path: PathBuf::from("/a/report.pdf"),
            mode: TransferMode::WholeFile,
            bytes: 42,
            failure: None,
        };
        assert_eq!(ok.into_result().unwrap(), 42);

        let failed = DeliveryReport {
            path: PathBuf::from("/a/report.pdf"),
            mode: TransferMode::WholeFile,
            bytes: 0,
            failure: Some("connection reset".to_string()),
        };
        assert!(matches!(
            failed.into_result(),
            Err(RelayError::WholeFileDelivery { .. })
        ));
    }
}
