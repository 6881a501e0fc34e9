//! Scripted response channel for unit tests.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::ResponseChannel;
use crate::BoxFuture;

/// Something the relay did to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    ContentType(String),
    Chunk(Vec<u8>),
    File(PathBuf),
    Abort(io::ErrorKind),
    Finish,
}

/// Records every call; can be told to fail writes or file sends.
#[derive(Debug, Default)]
pub(crate) struct RecordingChannel {
    pub(crate) events: Vec<Event>,
    pub(crate) committed: bool,
    /// Fail `write_chunk` once this many chunks have been accepted.
    pub(crate) fail_writes_after: Option<usize>,
    pub(crate) fail_send_file: bool,
}

impl RecordingChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn chunks(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Chunk(_)))
            .count()
    }
}

impl ResponseChannel for RecordingChannel {
    fn headers_sent(&self) -> bool {
        self.committed
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.events.push(Event::ContentType(content_type.to_string()));
    }

    fn write_chunk(&mut self, chunk: Bytes) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            if self.fail_writes_after.is_some_and(|limit| self.chunks() >= limit) {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away"));
            }
            self.committed = true;
            self.events.push(Event::Chunk(chunk.to_vec()));
            Ok(())
        })
    }

    fn send_file<'a>(&'a mut self, path: &'a Path) -> BoxFuture<'a, io::Result<u64>> {
        Box::pin(async move {
            self.events.push(Event::File(path.to_path_buf()));
            if self.fail_send_file {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away"));
            }
            self.committed = true;
            Ok(tokio::fs::metadata(path).await?.len())
        })
    }

    fn abort(&mut self, error: io::Error) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.events.push(Event::Abort(error.kind()));
        })
    }

    fn finish(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            self.committed = true;
            self.events.push(Event::Finish);
            Ok(())
        })
    }
}
