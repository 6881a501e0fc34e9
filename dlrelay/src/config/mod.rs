//! Configuration for the download relay.
//!
//! - [`RelayConfig`] holds the runtime settings consumed by the stager,
//!   watcher and streamer.
//! - [`ConfigFile`] is the persisted INI form at `~/.dlrelay/config.ini`.
//! - [`ConfigKey`] gives typed `section.key` access for the CLI.

mod file;
mod keys;
mod relay;

pub use file::{config_dir, config_file_path, ConfigFile, ConfigFileError};
pub use keys::ConfigKey;
pub use relay::{
    RelayConfig, DEFAULT_CHUNKED_CONTENT_TYPE, DEFAULT_CHUNK_SIZE, DEFAULT_PARTIAL_SUFFIX,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_SESSION_PREFIX,
};
