//! Persisted INI configuration.
//!
//! ```text
//! [workspace]
//! root = /tmp
//! session_prefix = .dlrelay.download.
//!
//! [download]
//! poll_interval_ms = 500
//! poll_timeout_secs = 120
//! partial_suffix = .crdownload
//!
//! [delivery]
//! content_type = application/octet-stream
//! chunk_size = 65536
//!
//! [browser]
//! cdp_url = ws://127.0.0.1:9222/devtools/page/<id>
//! command_timeout_secs = 10
//!
//! [logging]
//! directory = ~/.dlrelay/logs
//! level = info
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::keys::ConfigKey;
use super::relay::{
    RelayConfig, DEFAULT_CHUNKED_CONTENT_TYPE, DEFAULT_CHUNK_SIZE, DEFAULT_PARTIAL_SUFFIX,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_SESSION_PREFIX,
};
use crate::logging::{LoggingConfig, DEFAULT_LOG_FILE, DEFAULT_LOG_LEVEL};

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but could not be read or parsed.
    #[error("failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The key is not a known `section.key`.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    /// The value is not acceptable for the key.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// `[workspace]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSettings {
    pub root: PathBuf,
    pub session_prefix: String,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
    pub partial_suffix: String,
}

/// `[delivery]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverySettings {
    pub content_type: String,
    pub chunk_size: usize,
}

/// `[browser]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSettings {
    /// Default DevTools endpoint for `dlrelay fetch`.
    pub cdp_url: Option<String>,
    pub command_timeout_secs: u64,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub level: String,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub workspace: WorkspaceSettings,
    pub download: DownloadSettings,
    pub delivery: DeliverySettings,
    pub browser: BrowserSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            workspace: WorkspaceSettings {
                root: std::env::temp_dir(),
                session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            },
            download: DownloadSettings {
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
                poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
                partial_suffix: DEFAULT_PARTIAL_SUFFIX.to_string(),
            },
            delivery: DeliverySettings {
                content_type: DEFAULT_CHUNKED_CONTENT_TYPE.to_string(),
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
            browser: BrowserSettings {
                cdp_url: None,
                command_timeout_secs: 10,
            },
            logging: LoggingSettings {
                directory: config_dir().join("logs"),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}

/// Directory holding the configuration file and default logs.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dlrelay")
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from a specific file. Keys not present keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigFileError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific file, creating its parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_err = |source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            // Unset optional values are left out
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini.write_to_file(path).map_err(write_err)
    }

    /// Runtime settings for the relay.
    pub fn to_relay_config(&self) -> RelayConfig {
        RelayConfig::new(self.workspace.root.clone())
            .with_session_prefix(self.workspace.session_prefix.clone())
            .with_partial_suffix(self.download.partial_suffix.clone())
            .with_poll_interval(Duration::from_millis(self.download.poll_interval_ms))
            .with_poll_timeout(Duration::from_secs(self.download.poll_timeout_secs))
            .with_chunked_content_type(self.delivery.content_type.clone())
            .with_chunk_size(self.delivery.chunk_size)
    }

    /// Logging settings.
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            directory: self.logging.directory.clone(),
            file_name: DEFAULT_LOG_FILE.to_string(),
            level: self.logging.level.clone(),
        }
    }

    /// DevTools command timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.browser.command_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_keys_use_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[download]\npoll_interval_ms = 250\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();

        assert_eq!(config.download.poll_interval_ms, 250);
        assert_eq!(config.download.poll_timeout_secs, DEFAULT_POLL_TIMEOUT_SECS);
        assert_eq!(config.download.partial_suffix, ".crdownload");
        assert_eq!(config.browser.cdp_url, None);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.workspace.root = PathBuf::from("/srv/work");
        config.browser.cdp_url = Some("ws://127.0.0.1:9222/devtools/page/A".to_string());
        config.delivery.chunk_size = 4096;
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[download]\npoll_timeout_secs = soon\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_to_relay_config() {
        let mut config = ConfigFile::default();
        config.workspace.root = PathBuf::from("/srv/work");
        config.download.poll_interval_ms = 100;
        config.download.poll_timeout_secs = 30;

        let relay = config.to_relay_config();
        assert_eq!(relay.workspace_root, PathBuf::from("/srv/work"));
        assert_eq!(relay.poll_interval, Duration::from_millis(100));
        assert_eq!(relay.poll_timeout, Duration::from_secs(30));
    }
}
