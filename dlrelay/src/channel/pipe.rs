//! In-process response channel backed by a bounded mpsc queue.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

use super::ResponseChannel;
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::BoxFuture;

/// Chunks buffered between writer and reader.
pub const DEFAULT_PIPE_CAPACITY: usize = 16;

type BodyItem = io::Result<Bytes>;

#[derive(Debug, Default)]
struct Head {
    committed: AtomicBool,
    content_type: Mutex<Option<String>>,
}

/// Writing half of a [`pipe`].
#[derive(Debug)]
pub struct PipeResponse {
    head: Arc<Head>,
    tx: Option<mpsc::Sender<BodyItem>>,
    chunk_size: usize,
}

/// Reading half of a [`pipe`]: the response body as a stream of chunks.
///
/// An `Err` item means the body was aborted and is truncated.
#[derive(Debug)]
pub struct ResponseBody {
    head: Arc<Head>,
    rx: mpsc::Receiver<BodyItem>,
}

/// Marks the response as committed from outside the relay.
///
/// This is how an HTTP layer that has already answered the client (or
/// wants to give up waiting) stops the relay's poll loop.
#[derive(Debug, Clone)]
pub struct CommitHandle {
    head: Arc<Head>,
}

/// Create a connected response channel and body.
pub fn pipe(capacity: usize) -> (PipeResponse, ResponseBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let head = Arc::new(Head::default());
    (
        PipeResponse {
            head: head.clone(),
            tx: Some(tx),
            chunk_size: DEFAULT_CHUNK_SIZE,
        },
        ResponseBody { head, rx },
    )
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "response body closed")
}

impl PipeResponse {
    /// Set the read size used by `send_file`.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    fn commit(&self) {
        self.head.committed.store(true, Ordering::SeqCst);
    }

    async fn push(&mut self, item: BodyItem) -> io::Result<()> {
        let tx = self.tx.as_ref().ok_or_else(broken_pipe)?;
        self.commit();
        tx.send(item).await.map_err(|_| broken_pipe())
    }
}

impl ResponseChannel for PipeResponse {
    fn headers_sent(&self) -> bool {
        self.head.committed.load(Ordering::SeqCst)
            || self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }

    fn set_content_type(&mut self, content_type: &str) {
        if !self.headers_sent() {
            *self.head.content_type.lock() = Some(content_type.to_string());
        }
    }

    fn write_chunk(&mut self, chunk: Bytes) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move { self.push(Ok(chunk)).await })
    }

    fn send_file<'a>(&'a mut self, path: &'a Path) -> BoxFuture<'a, io::Result<u64>> {
        Box::pin(async move {
            if self.tx.is_none() {
                return Err(broken_pipe());
            }
            // A missing file fails before anything is committed
            let file = tokio::fs::File::open(path).await?;
            self.commit();

            let mut reader = ReaderStream::with_capacity(file, self.chunk_size);
            let mut sent = 0u64;
            while let Some(item) = reader.next().await {
                match item {
                    Ok(chunk) => {
                        let len = chunk.len() as u64;
                        self.push(Ok(chunk)).await?;
                        sent += len;
                    }
                    Err(e) => {
                        let _ = self.push(Err(io::Error::new(e.kind(), e.to_string()))).await;
                        self.tx = None;
                        return Err(e);
                    }
                }
            }

            self.tx = None;
            Ok(sent)
        })
    }

    fn abort(&mut self, error: io::Error) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let _ = self.push(Err(error)).await;
            self.tx = None;
        })
    }

    fn finish(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            if self.tx.take().is_none() {
                return Err(broken_pipe());
            }
            self.commit();
            Ok(())
        })
    }
}

impl ResponseBody {
    /// Content type set by the writer, if any.
    pub fn content_type(&self) -> Option<String> {
        self.head.content_type.lock().clone()
    }

    /// Whether the writer has committed headers.
    pub fn is_committed(&self) -> bool {
        self.head.committed.load(Ordering::SeqCst)
    }

    /// Handle that can commit the response from elsewhere.
    pub fn commit_handle(&self) -> CommitHandle {
        CommitHandle {
            head: self.head.clone(),
        }
    }

    /// Read the whole body. Fails with the abort error if the body was aborted.
    pub async fn collect(mut self) -> io::Result<Vec<u8>> {
        let mut body = Vec::new();
        while let Some(item) = self.rx.recv().await {
            body.extend_from_slice(&item?);
        }
        Ok(body)
    }
}

impl Stream for ResponseBody {
    type Item = BodyItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl CommitHandle {
    /// Mark headers as sent.
    pub fn commit(&self) {
        self.head.committed.store(true, Ordering::SeqCst);
    }

    pub fn is_committed(&self) -> bool {
        self.head.committed.load(Ordering::SeqCst)
    }
}
