//! Configuration file handling.
//!
//! Defaults for the `scan` command, loaded from a TOML file. Every value
//! can be overridden by the matching command-line flag.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/npm-vulnscan/config.toml`
//! - macOS: `~/Library/Application Support/npm-vulnscan/config.toml`
//! - Windows: `%APPDATA%\npm-vulnscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! name_column = 1
//! version_column = 2
//! max_depth = 64
//! default_format = "text"
//! npm_command = "npm"
//! dump_dir = "build"
//! log_level = "warn"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::database::CsvColumns;
use crate::scanner::{default_npm_program, DEFAULT_MAX_DEPTH};

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use npm_vulnscan::Config;
///
/// let config = Config::load().unwrap();
/// println!("Package names in CSV column {}", config.name_column);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 1-based CSV column holding package names.
    ///
    /// Default: 1
    pub name_column: usize,

    /// 1-based CSV column holding the space-separated affected versions.
    ///
    /// Default: 2
    pub version_column: usize,

    /// Deepest nesting level of the npm listing whose packages are recorded.
    ///
    /// Default: 64
    pub max_depth: usize,

    /// Report format when no `--format` flag is provided.
    ///
    /// Valid values: "text", "json"
    /// Default: "text"
    pub default_format: String,

    /// npm executable used to list dependencies.
    pub npm_command: String,

    /// Directory where raw npm output is saved, if any.
    pub dump_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    ///
    /// Default: "warn"
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name_column: 1,
            version_column: 2,
            max_depth: DEFAULT_MAX_DEPTH,
            default_format: "text".to_string(),
            npm_command: default_npm_program().to_string(),
            dump_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Like [`load`](Self::load), but an unusable file yields the defaults.
    ///
    /// The load error is handed back so the caller can report it once
    /// logging is set up.
    pub fn load_or_default() -> (Self, Option<anyhow::Error>) {
        Self::load_or_default_from(&Self::config_path())
    }

    pub fn load_or_default_from(path: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to the config file, creating its directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use npm_vulnscan::Config;
    ///
    /// let path = Config::config_path();
    /// assert!(path.ends_with("npm-vulnscan/config.toml"));
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("npm-vulnscan")
            .join("config.toml")
    }

    /// The configured CSV columns.
    ///
    /// # Errors
    ///
    /// Fails when either column number is 0.
    pub fn columns(&self) -> crate::error::Result<CsvColumns> {
        CsvColumns::from_one_based(self.name_column, self.version_column)
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
