//! dlrelay - deliver browser-driven downloads over an HTTP-shaped response
//!
//! A browser session is pointed at a fresh, isolated directory; once the
//! download it performs finishes writing, the file is streamed back to the
//! waiting client and the directory is removed.
//!
//! # Architecture
//!
//! ```text
//! SessionStager ──► DownloadSession ──► DownloadCompletionWatcher ──► ResponseStreamer
//!   (mkdir +           (directory          (poll until a non-partial      (Chunked |
//!    browser call)      handle)             entry appears, then cleanup)   WholeFile)
//! ```
//!
//! [`relay::DownloadRelay`] wires the pieces together from a
//! [`config::RelayConfig`].

use std::future::Future;
use std::pin::Pin;

pub mod browser;
pub mod channel;
pub mod config;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod relay;
pub mod session;
pub mod telemetry;
pub mod watcher;

pub use error::{RelayError, RelayResult};
pub use relay::DownloadRelay;

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
