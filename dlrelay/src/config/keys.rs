//! Typed access to individual configuration keys.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigFile, ConfigFileError};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A `section.key` entry of `config.ini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    WorkspaceRoot,
    WorkspaceSessionPrefix,
    DownloadPollIntervalMs,
    DownloadPollTimeoutSecs,
    DownloadPartialSuffix,
    DeliveryContentType,
    DeliveryChunkSize,
    BrowserCdpUrl,
    BrowserCommandTimeoutSecs,
    LoggingDirectory,
    LoggingLevel,
}

impl ConfigKey {
    /// All keys, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            Self::WorkspaceRoot,
            Self::WorkspaceSessionPrefix,
            Self::DownloadPollIntervalMs,
            Self::DownloadPollTimeoutSecs,
            Self::DownloadPartialSuffix,
            Self::DeliveryContentType,
            Self::DeliveryChunkSize,
            Self::BrowserCdpUrl,
            Self::BrowserCommandTimeoutSecs,
            Self::LoggingDirectory,
            Self::LoggingLevel,
        ]
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        match self {
            Self::WorkspaceRoot | Self::WorkspaceSessionPrefix => "workspace",
            Self::DownloadPollIntervalMs
            | Self::DownloadPollTimeoutSecs
            | Self::DownloadPartialSuffix => "download",
            Self::DeliveryContentType | Self::DeliveryChunkSize => "delivery",
            Self::BrowserCdpUrl | Self::BrowserCommandTimeoutSecs => "browser",
            Self::LoggingDirectory | Self::LoggingLevel => "logging",
        }
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::WorkspaceRoot => "root",
            Self::WorkspaceSessionPrefix => "session_prefix",
            Self::DownloadPollIntervalMs => "poll_interval_ms",
            Self::DownloadPollTimeoutSecs => "poll_timeout_secs",
            Self::DownloadPartialSuffix => "partial_suffix",
            Self::DeliveryContentType => "content_type",
            Self::DeliveryChunkSize => "chunk_size",
            Self::BrowserCdpUrl => "cdp_url",
            Self::BrowserCommandTimeoutSecs => "command_timeout_secs",
            Self::LoggingDirectory => "directory",
            Self::LoggingLevel => "level",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string. Empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::WorkspaceRoot => config.workspace.root.to_string_lossy().to_string(),
            Self::WorkspaceSessionPrefix => config.workspace.session_prefix.clone(),
            Self::DownloadPollIntervalMs => config.download.poll_interval_ms.to_string(),
            Self::DownloadPollTimeoutSecs => config.download.poll_timeout_secs.to_string(),
            Self::DownloadPartialSuffix => config.download.partial_suffix.clone(),
            Self::DeliveryContentType => config.delivery.content_type.clone(),
            Self::DeliveryChunkSize => config.delivery.chunk_size.to_string(),
            Self::BrowserCdpUrl => config.browser.cdp_url.clone().unwrap_or_default(),
            Self::BrowserCommandTimeoutSecs => config.browser.command_timeout_secs.to_string(),
            Self::LoggingDirectory => config.logging.directory.to_string_lossy().to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Validate and store a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigFileError> {
        let value = value.trim();
        match self {
            Self::WorkspaceRoot => config.workspace.root = self.parse_path(value)?,
            Self::WorkspaceSessionPrefix => {
                config.workspace.session_prefix = self.parse_text(value)?
            }
            Self::DownloadPollIntervalMs => {
                config.download.poll_interval_ms = self.parse_positive(value)?
            }
            Self::DownloadPollTimeoutSecs => {
                config.download.poll_timeout_secs = self.parse_positive(value)?
            }
            Self::DownloadPartialSuffix => config.download.partial_suffix = self.parse_text(value)?,
            Self::DeliveryContentType => config.delivery.content_type = self.parse_text(value)?,
            Self::DeliveryChunkSize => {
                config.delivery.chunk_size = self.parse_positive::<u64>(value)? as usize
            }
            Self::BrowserCdpUrl => {
                config.browser.cdp_url = if value.is_empty() {
                    None
                } else if value.starts_with("ws://") || value.starts_with("wss://") {
                    Some(value.to_string())
                } else {
                    return Err(self.invalid(value, "expected a ws:// or wss:// URL"));
                }
            }
            Self::BrowserCommandTimeoutSecs => {
                config.browser.command_timeout_secs = self.parse_positive(value)?
            }
            Self::LoggingDirectory => config.logging.directory = self.parse_path(value)?,
            Self::LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(self.invalid(value, "expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_positive<T>(&self, value: &str) -> Result<T, ConfigFileError>
    where
        T: FromStr + PartialOrd + Default,
    {
        match value.parse::<T>() {
            Ok(n) if n > T::default() => Ok(n),
            _ => Err(self.invalid(value, "expected a positive integer")),
        }
    }

    fn parse_text(&self, value: &str) -> Result<String, ConfigFileError> {
        if value.is_empty() {
            return Err(self.invalid(value, "must not be empty"));
        }
        Ok(value.to_string())
    }

    fn parse_path(&self, value: &str) -> Result<PathBuf, ConfigFileError> {
        if value.is_empty() {
            return Err(self.invalid(value, "must not be empty"));
        }
        Ok(PathBuf::from(value))
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|key| key.name() == s.trim())
            .ok_or_else(|| ConfigFileError::UnknownKey(s.to_string()))
    }
}
