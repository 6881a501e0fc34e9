//! Shared setup for commands that talk to a browser.

use dlrelay::config::{config_file_path, ConfigFile};
use dlrelay::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus an installed logger.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load the config file and install logging.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let logging = init_logging(&config.logging_config())?;
        Ok(Self {
            config,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log which command started and where its settings came from.
    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = dlrelay::VERSION,
            config = %config_file_path().display(),
            log = %self.config.logging_config().log_path().display(),
            "dlrelay starting"
        );
    }

    /// Multi-threaded runtime for the command's async work.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }
}
