//! Configuration file support for mcbootflash.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (MCBOOTFLASH_*)
//! 3. Local config file (./mcbootflash.toml)
//! 4. Global config file (~/.config/mcbootflash/config.toml)
//!
//! The first two are handled by clap; this module merges the files.

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-project config file, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "mcbootflash.toml";

/// Connection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Preferred serial port (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: Option<String>,
    /// Default baud rate.
    pub baud: Option<u32>,
    /// Read timeout in seconds.
    pub timeout: Option<f64>,
}

/// Flash configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashConfig {
    /// Reset the device after a successful flash.
    #[serde(default)]
    pub reset_after: bool,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Flash configuration.
    #[serde(default)]
    pub flash: FlashConfig,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        Self::load_layered(
            Self::global_config_path().as_deref(),
            Path::new(LOCAL_CONFIG_FILE),
        )
    }

    /// Merge the local file over the global one. Missing files are skipped.
    fn load_layered(global: Option<&Path>, local: &Path) -> Self {
        let mut config = Self::default();

        if let Some(global_path) = global {
            if let Some(global_config) = Self::load_from_file(global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        if let Some(local_config) = Self::load_from_file(local) {
            debug!("Loaded local config from {}", local.display());
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "mcbootflash").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        if other.connection.port.is_some() {
            self.connection.port = other.connection.port;
        }
        if other.connection.baud.is_some() {
            self.connection.baud = other.connection.baud;
        }
        if other.connection.timeout.is_some() {
            self.connection.timeout = other.connection.timeout;
        }

        if other.flash.reset_after {
            self.flash.reset_after = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.connection.port.is_none());
        assert!(config.connection.baud.is_none());
        assert!(config.connection.timeout.is_none());
        assert!(!config.flash.reset_after);
    }

    // ---- Config merge ----

    #[test]
    fn test_config_merge_overrides_set_fields() {
        let mut base = Config::default();
        base.connection.port = Some("/dev/ttyUSB0".to_string());
        base.connection.baud = Some(115200);

        let mut other = Config::default();
        other.connection.baud = Some(460800);
        other.connection.timeout = Some(2.5);
        other.flash.reset_after = true;

        base.merge(other);

        assert_eq!(base.connection.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(base.connection.baud, Some(460800));
        assert_eq!(base.connection.timeout, Some(2.5));
        assert!(base.flash.reset_after);
    }

    #[test]
    fn test_config_merge_does_not_overwrite_with_none() {
        let mut base = Config::default();
        base.connection.port = Some("COM3".to_string());
        base.connection.timeout = Some(1.0);
        base.flash.reset_after = true;

        base.merge(Config::default());

        assert_eq!(base.connection.port.as_deref(), Some("COM3"));
        assert_eq!(base.connection.timeout, Some(1.0));
        assert!(base.flash.reset_after);
    }

    // ---- TOML ----

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[connection]
port = "/dev/ttyACM0"
baud = 230400
timeout = 0.5

[flash]
reset_after = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.connection.baud, Some(230400));
        assert_eq!(config.connection.timeout, Some(0.5));
        assert!(config.flash.reset_after);
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config: Config = toml::from_str("[flash]\nreset_after = true\n").unwrap();
        assert!(config.connection.port.is_none());
        assert!(config.flash.reset_after);

        let config: Config = toml::from_str("").unwrap();
        assert!(!config.flash.reset_after);
    }

    // ---- Loading from disk ----

    #[test]
    fn test_load_from_path_valid() {
        let dir = tempdir().unwrap();
        let path = dir
            .path()
            .join("custom.toml");
        fs::write(&path, "[connection]\nport = \"/dev/ttyUSB1\"\n").unwrap();

        let config = Config::load_from_path(&path);
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyUSB1"));
    }

    #[test]
    fn test_load_from_path_nonexistent() {
        let config = Config::load_from_path(Path::new("/nonexistent/path/config.toml"));
        assert!(config.connection.port.is_none());
    }

    #[test]
    fn test_invalid_file_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir
            .path()
            .join("broken.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        let config = Config::load_from_path(&path);
        assert!(config.connection.port.is_none());
    }

    #[test]
    fn test_local_overrides_global() {
        let dir = tempdir().unwrap();
        let global = dir
            .path()
            .join("config.toml");
        let local = dir
            .path()
            .join(LOCAL_CONFIG_FILE);
        fs::write(
            &global,
            "[connection]\nport = \"/dev/ttyS0\"\nbaud = 9600\n\n[flash]\nreset_after = true\n",
        )
        .unwrap();
        fs::write(&local, "[connection]\nport = \"/dev/ttyUSB0\"\n").unwrap();

        let config = Config::load_layered(Some(&global), &local);
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.connection.baud, Some(9600));
        assert!(config.flash.reset_after);
    }

    #[test]
    fn test_invalid_local_keeps_global() {
        let dir = tempdir().unwrap();
        let global = dir
            .path()
            .join("config.toml");
        let local = dir
            .path()
            .join(LOCAL_CONFIG_FILE);
        fs::write(&global, "[connection]\nbaud = 57600\n").unwrap();
        fs::write(&local, "[connection\nbaud = ").unwrap();

        let config = Config::load_layered(Some(&global), &local);
        assert_eq!(config.connection.baud, Some(57600));
    }

    #[test]
    fn test_global_config_path_is_under_project_dir() {
        if let Some(p) = Config::global_config_path() {
            assert!(p.to_str().unwrap().contains("mcbootflash"));
            assert!(p.to_str().unwrap().ends_with("config.toml"));
        }
    }
}
