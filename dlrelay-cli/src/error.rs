//! CLI error type.

use std::fmt;
use std::io;
use std::path::PathBuf;

use dlrelay::browser::BrowserError;
use dlrelay::config::ConfigFileError;
use dlrelay::logging::LoggingError;
use dlrelay::RelayError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Missing or invalid configuration.
    Config(String),
    /// Reading or writing the config file failed.
    ConfigFile(ConfigFileError),
    /// Logging could not be installed.
    Logging(LoggingError),
    /// The async runtime could not be started.
    Runtime(io::Error),
    /// Talking to the browser failed.
    Browser(BrowserError),
    /// The relay failed to stage or deliver.
    Relay(RelayError),
    /// Writing the downloaded bytes failed.
    Output { path: Option<PathBuf>, source: io::Error },
    /// The body was cut off before completion.
    Transfer(io::Error),
    /// Nothing was delivered.
    NotDelivered(String),
    /// Some stale directories could not be removed.
    Clean(String),
    /// Interrupted with Ctrl-C.
    Cancelled,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Config file error: {}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Browser(e) => write!(f, "Browser error: {}", e),
            CliError::Relay(e) => write!(f, "{}", e),
            CliError::Output { path: Some(path), source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            CliError::Output { path: None, source } => {
                write!(f, "Failed to write to stdout: {}", source)
            }
            CliError::Transfer(e) => write!(f, "Transfer aborted: {}", e),
            CliError::NotDelivered(reason) => write!(f, "Nothing was delivered: {}", reason),
            CliError::Clean(msg) => write!(f, "Cleanup incomplete: {}", msg),
            CliError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Runtime(e) | CliError::Transfer(e) => Some(e),
            CliError::Browser(e) => Some(e),
            CliError::Relay(e) => Some(e),
            CliError::Output { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<BrowserError> for CliError {
    fn from(e: BrowserError) -> Self {
        CliError::Browser(e)
    }
}

impl From<RelayError> for CliError {
    fn from(e: RelayError) -> Self {
        CliError::Relay(e)
    }
}
