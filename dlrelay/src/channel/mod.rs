//! The outbound response a download is delivered on.
//!
//! The relay does not own an HTTP server. It writes to anything implementing
//! [`ResponseChannel`]: a "headers already sent" query, a content type, a
//! byte sink, and a whole-file send. [`pipe`] provides an in-process
//! implementation whose [`ResponseBody`] is a `Stream` of byte chunks that an
//! HTTP layer can forward as a response body.

mod pipe;
#[cfg(test)]
pub(crate) mod testing;

use std::io;
use std::path::Path;

use bytes::Bytes;

use crate::BoxFuture;

pub use pipe::{pipe, CommitHandle, PipeResponse, ResponseBody, DEFAULT_PIPE_CAPACITY};

/// Request metadata the relay needs from the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Value of the `Transfer-Encoding` request header, if any.
    pub transfer_encoding: Option<String>,
}

impl RequestMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `Transfer-Encoding` header value.
    pub fn with_transfer_encoding(mut self, value: impl Into<String>) -> Self {
        self.transfer_encoding = Some(value.into());
        self
    }

    /// Whether the request declared chunked transfer coding.
    ///
    /// Any comma-separated coding equal to `chunked` (ignoring case) counts.
    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding.as_deref().is_some_and(|value| {
            value
                .split(',')
                .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
        })
    }
}

/// An HTTP-shaped response the relay can write a file to.
///
/// Writing any body bytes commits the headers. After a successful
/// [`finish`](Self::finish) or an [`abort`](Self::abort), writes fail with
/// `BrokenPipe`.
pub trait ResponseChannel: Send {
    /// Whether headers have been sent, or the response can no longer be written.
    fn headers_sent(&self) -> bool;

    /// Set the `Content-Type` header. Ignored once headers are sent.
    fn set_content_type(&mut self, content_type: &str);

    /// Append a chunk to the body.
    fn write_chunk(&mut self, chunk: Bytes) -> BoxFuture<'_, io::Result<()>>;

    /// Send an entire file as the body and complete the response.
    ///
    /// Resolves once the transfer has finished, with the number of bytes sent.
    fn send_file<'a>(&'a mut self, path: &'a Path) -> BoxFuture<'a, io::Result<u64>>;

    /// Terminate the body with an error. No further bytes are written.
    fn abort(&mut self, error: io::Error) -> BoxFuture<'_, ()>;

    /// Complete the response.
    fn finish(&mut self) -> BoxFuture<'_, io::Result<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_detection() {
        assert!(!RequestMeta::new().is_chunked());
        assert!(RequestMeta::new().with_transfer_encoding("chunked").is_chunked());
        assert!(RequestMeta::new().with_transfer_encoding("Chunked").is_chunked());
        assert!(RequestMeta::new()
            .with_transfer_encoding("gzip, chunked")
            .is_chunked());
        assert!(!RequestMeta::new().with_transfer_encoding("gzip").is_chunked());
        assert!(!RequestMeta::new().with_transfer_encoding("").is_chunked());
    }
}
