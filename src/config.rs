//! Configuration file handling.
//!
//! This module provides loading and saving of depscan configuration from a
//! TOML file.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/depscan/config.toml`
//! - macOS: `~/Library/Application Support/depscan/config.toml`
//! - Windows: `%APPDATA%\depscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! registry_url = "https://pypi.org/pypi"
//! lookup_delay_ms = 1000
//! request_timeout_secs = 10
//! max_retries = 3
//! expand_transitive = true
//!
//! [ignore]
//! directories = ["venv*", "dist"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::PypiRegistry;

/// Application configuration.
///
/// Every field has a default, so a partial file (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the PyPI JSON API used for one-level expansion.
    ///
    /// Default: `https://pypi.org/pypi`
    pub registry_url: String,

    /// Pause between consecutive registry lookups, in milliseconds.
    ///
    /// Default: 1000
    pub lookup_delay_ms: u64,

    /// Per-request timeout for registry lookups, in seconds.
    ///
    /// Default: 10
    pub request_timeout_secs: u64,

    /// Attempts per registry lookup before giving up.
    ///
    /// Default: 3
    pub max_retries: u32,

    /// Whether `requirements.txt` entries are expanded through the registry.
    ///
    /// Default: true
    pub expand_transitive: bool,

    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Extra directories to leave out of a scan.
///
/// `node_modules` and hidden directories are always skipped; this adds to
/// that list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Directory names to prune. Supports `*` wildcards (e.g. `venv*`).
    pub directories: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a directory with this base name should be pruned.
    pub fn should_ignore_directory(&self, name: &str) -> bool {
        self.directories.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, name)
            } else {
                pattern == name
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: crate::registry::DEFAULT_PYPI_URL.to_string(),
            lookup_delay_ms: 1000,
            request_timeout_secs: 10,
            max_retries: 3,
            expand_transitive: true,
            ignore: IgnoreConfig::default(),
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

    /// Loads configuration from an explicit path, falling back to defaults
    /// when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depscan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn lookup_delay(&self) -> Duration {
        Duration::from_millis(self.lookup_delay_ms)
    }

    /// Builds the PyPI client described by this configuration.
    pub fn registry(&self) -> crate::Result<PypiRegistry> {
        PypiRegistry::from_config(self)
    }
}
