//! Configuration types for the development loop.
//!
//! This module provides configuration structs for loading and validating
//! devloop project settings from TOML files:
//!
//! - [`Config`] - Root configuration struct
//! - [`ServerConfig`] - Application server settings
//! - [`AssetsConfig`] - Asset build tool settings
//!
//! All configuration types support serde deserialization and provide
//! sensible defaults suitable for development use. CLI flags take
//! precedence over manifest values; the orchestrator core never reads
//! configuration files itself.
//!
//! # Example
//!
//! ```
//! use devloop::config::Config;
//!
//! let toml = r#"
//! [server]
//! entry = "site.py"
//! port = 5000
//!
//! [assets]
//! input = "css/site.css"
//! "#;
//!
//! let config: Config = toml::from_str(toml).unwrap();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.server.port, 5000);
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;

/// devloop.toml configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
}

/// Application server settings.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Application entry file containing the ASGI `app` object.
    #[serde(default = "default_entry")]
    pub entry: PathBuf,
    /// Port for the HTTP server.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Glob patterns that trigger a server reload.
    #[serde(default = "default_watch")]
    pub watch: Vec<String>,
    /// Route live-reload notifications through the orchestrator's shim.
    #[serde(default = "default_true")]
    pub hot_reload: bool,
    /// Run the server with debug logging.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            port: default_port(),
            watch: default_watch(),
            hot_reload: true,
            debug: false,
        }
    }
}

/// Asset build tool settings.
#[derive(Debug, Deserialize)]
pub struct AssetsConfig {
    /// Run the asset watcher alongside the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Build tool binary.
    #[serde(default = "default_asset_bin")]
    pub bin: PathBuf,
    /// Input asset file.
    #[serde(default = "default_asset_input")]
    pub input: PathBuf,
    /// Output asset file.
    #[serde(default = "default_asset_output")]
    pub output: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bin: default_asset_bin(),
            input: default_asset_input(),
            output: default_asset_output(),
        }
    }
}

fn default_entry() -> PathBuf {
    PathBuf::from(constants::DEFAULT_ENTRY)
}

const fn default_port() -> u16 {
    constants::DEFAULT_PORT
}

fn default_watch() -> Vec<String> {
    constants::DEFAULT_WATCH_PATTERNS
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

const fn default_true() -> bool {
    true
}

fn default_asset_bin() -> PathBuf {
    PathBuf::from(constants::DEFAULT_ASSET_BIN)
}

fn default_asset_input() -> PathBuf {
    PathBuf::from(constants::DEFAULT_ASSET_INPUT)
}

fn default_asset_output() -> PathBuf {
    PathBuf::from(constants::DEFAULT_ASSET_OUTPUT)
}

impl Config {
    /// Load configuration from devloop.toml in the current directory,
    /// falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new(constants::CONFIG_FILE_NAME);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails:
    /// - Empty entry path or port 0
    /// - Empty watch patterns
    /// - Asset input and output pointing at the same file
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.server.entry.as_os_str().is_empty() {
            errors.push("server.entry cannot be empty".to_string());
        }
        if self.server.port == 0 {
            errors.push("server.port cannot be 0".to_string());
        }
        for pattern in &self.server.watch {
            if pattern.is_empty() {
                errors.push("server.watch patterns cannot be empty".to_string());
            }
        }

        if self.assets.enabled {
            if self.assets.bin.as_os_str().is_empty() {
                errors.push("assets.bin cannot be empty".to_string());
            }
            if self.assets.input == self.assets.output {
                errors.push(format!(
                    "assets.input and assets.output must differ (both: '{}')",
                    self.assets.input.display()
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_gets_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.entry, PathBuf::from("main.py"));
        assert_eq!(config.server.port, constants::DEFAULT_PORT);
        assert_eq!(config.server.watch, vec!["*.py".to_string()]);
        assert!(config.server.hot_reload);
        assert!(!config.server.debug);
        assert!(config.assets.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_manifest_keeps_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 5000

            [assets]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.entry, PathBuf::from("main.py"));
        assert!(!config.assets.enabled);
    }

    #[test]
    fn rejects_port_zero() {
        let config: Config = toml::from_str("[server]\nport = 0").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port"));
    }

    #[test]
    fn rejects_empty_entry() {
        let config: Config = toml::from_str("[server]\nentry = \"\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_matching_asset_input_output() {
        let config: Config = toml::from_str(
            r#"
            [assets]
            input = "build.css"
            output = "build.css"
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must differ"));
    }

    #[test]
    fn disabled_assets_skip_asset_checks() {
        let config: Config = toml::from_str(
            r#"
            [assets]
            enabled = false
            input = "same.css"
            output = "same.css"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_missing_file_errors() {
        let result = Config::load_from("definitely_missing_devloop.toml");
        assert!(result.is_err());
    }
}
