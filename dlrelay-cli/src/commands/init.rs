//! Init command - write the configuration file.

use std::path::Path;

use dlrelay::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    let config = write_config(&path)?;

    println!("Configuration file: {}", path.display());
    println!();

    let root = &config.workspace.root;
    if root.is_dir() {
        println!("Workspace: {}", root.display());
    } else {
        println!("Workspace {} does not exist.", root.display());
        println!("Create it, or choose another with:");
        println!("  dlrelay config set workspace.root <directory>");
    }

    if config.browser.cdp_url.is_none() {
        println!();
        println!("No DevTools endpoint configured. Start Chrome with --remote-debugging-port");
        println!("and set the page's WebSocket URL with:");
        println!("  dlrelay config set browser.cdp_url ws://127.0.0.1:9222/devtools/page/<id>");
    }

    println!();
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

/// Write `path` with its current settings plus defaults for anything unset.
///
/// A file that fails to parse is left untouched and the error returned.
fn write_config(path: &Path) -> Result<ConfigFile, CliError> {
    let config = if path.exists() {
        ConfigFile::load_from(path)?
    } else {
        ConfigFile::default()
    };
    config.save_to(path)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_missing_file_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".dlrelay").join("config.ini");

        let config = write_config(&path).unwrap();

        assert_eq!(config, ConfigFile::default());
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_keeps_existing_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[browser]\ncdp_url = ws://127.0.0.1:9222/devtools/page/KEEP\n",
        )
        .unwrap();

        let config = write_config(&path).unwrap();

        assert_eq!(
            config.browser.cdp_url.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/page/KEEP")
        );
        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded.browser.cdp_url, config.browser.cdp_url);
        assert_eq!(reloaded.download, ConfigFile::default().download);
    }

    #[test]
    fn test_malformed_file_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        let original = "[browser]\n\
                        cdp_url = ws://127.0.0.1:9222/devtools/page/KEEP\n\
                        \n\
                        [download]\n\
                        poll_timeout_secs = soon\n";
        std::fs::write(&path, original).unwrap();

        let err = write_config(&path).unwrap_err();

        assert!(matches!(err, CliError::ConfigFile(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }
}
