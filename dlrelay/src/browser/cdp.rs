//! Minimal Chrome DevTools Protocol client.
//!
//! Speaks just enough CDP to bind a page's downloads to a directory and to
//! trigger a navigation. Commands are serialized over one WebSocket; the
//! reader skips event notifications until the response carrying the
//! command's id arrives.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{BrowserError, DownloadBehavior, DownloadBehaviorControl};
use crate::BoxFuture;

/// Default time to wait for the response to a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct Command<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct Incoming {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: i64,
    message: String,
}

/// DevTools connection to a single page target.
pub struct CdpClient {
    url: String,
    socket: Mutex<Socket>,
    next_id: AtomicU64,
    command_timeout: Duration,
}

impl CdpClient {
    /// Connect to a page's DevTools WebSocket endpoint.
    pub async fn connect(url: &str) -> Result<Self, BrowserError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| BrowserError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!(url, "Connected to DevTools endpoint");

        Ok(Self {
            url: url.to_string(),
            socket: Mutex::new(socket),
            next_id: AtomicU64::new(1),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    /// Set the per-command response timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Endpoint this client is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a command and wait for its result.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::to_string(&Command { id, method, params })?;

        let mut socket = self.socket.lock().await;
        socket
            .send(Message::Text(payload))
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;

        let exchange = async {
            loop {
                match socket.next().await {
                    None | Some(Ok(Message::Close(_))) => return Err(BrowserError::Closed),
                    Some(Err(e)) => return Err(BrowserError::Transport(e.to_string())),
                    Some(Ok(Message::Text(text))) => {
                        let incoming: Incoming = serde_json::from_str(&text)?;
                        if incoming.id != Some(id) {
                            trace!(
                                event = incoming.method.as_deref().unwrap_or("unknown"),
                                "Skipping DevTools message"
                            );
                            continue;
                        }
                        if let Some(error) = incoming.error {
                            return Err(BrowserError::Rejected {
                                method: method.to_string(),
                                code: error.code,
                                message: error.message,
                            });
                        }
                        return Ok(incoming.result.unwrap_or(Value::Null));
                    }
                    Some(Ok(_)) => continue,
                }
            }
        };

        tokio::time::timeout(self.command_timeout, exchange)
            .await
            .map_err(|_| BrowserError::Timeout {
                method: method.to_string(),
                timeout: self.command_timeout,
            })?
    }

    /// Navigate the page to `url`.
    ///
    /// Chrome reports navigations that end in a download as aborted, so an
    /// `errorText` in the result is logged rather than returned.
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self.send("Page.navigate", json!({ "url": url })).await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            debug!(url, error_text, "Navigation did not commit");
        }
        Ok(())
    }

    /// Close the WebSocket.
    pub async fn close(&self) -> Result<(), BrowserError> {
        self.socket
            .lock()
            .await
            .close(None)
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))
    }
}

impl DownloadBehaviorControl for CdpClient {
    fn set_download_behavior<'a>(
        &'a self,
        behavior: DownloadBehavior,
        download_path: &'a Path,
    ) -> BoxFuture<'a, Result<(), BrowserError>> {
        Box::pin(async move {
            let path = download_path
                .to_str()
                .ok_or_else(|| BrowserError::InvalidPath(download_path.display().to_string()))?;

            self.send(
                "Page.setDownloadBehavior",
                json!({ "behavior": behavior.as_str(), "downloadPath": path }),
            )
            .await?;

            debug!(behavior = %behavior, path, "Download behavior applied");
            Ok(())
        })
    }
}
