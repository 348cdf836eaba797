//! Client configuration: a YAML file under the porter home directory,
//! created with defaults on first use, with `PORTER_*` environment
//! overrides applied on top.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::meta::find_by_extensions;
use crate::paths;

/// Errors produced while loading or creating the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file is not valid YAML.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An I/O error while reading or creating the configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identity and signing key of the maintainer running this client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintainerConfig {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Path to the base64-encoded ed25519 signing key file.
    pub signing_key: String,
}

/// Root configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where binary package entries are installed.
    pub bin_dir: PathBuf,
    /// Where source package entries are installed.
    pub src_dir: PathBuf,
    /// Path of the local install cache file.
    pub cache_path: PathBuf,
    /// Base URL of the archive's read side (index + artifact downloads).
    pub archive_addr: String,
    /// Base URL of the archive's upload endpoint.
    pub upload_addr: String,
    /// The maintainer identity used by `sign` and scaffold operations.
    pub maintainer: MaintainerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bin_dir: paths::bin_dir(),
            src_dir: paths::src_dir(),
            cache_path: paths::cache_path(),
            archive_addr: "https://archive.porter.dev".to_string(),
            upload_addr: "https://archive.porter.dev".to_string(),
            maintainer: MaintainerConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration from the default location, creating it with
    /// defaults on first use, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, created or
    /// parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file(&paths::config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load the configuration from an explicit path, creating it with
    /// defaults when missing. Accepts a `.yml` spelling at the read
    /// boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, created or
    /// parsed.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        match find_by_extensions(path, &["yaml", "yml"]) {
            Ok(existing) => {
                let body = fs::read_to_string(existing)?;
                Ok(serde_yaml::from_str(&body)?)
            }
            Err(_) => {
                let config = Self::default();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, serde_yaml::to_string(&config)?)?;
                tracing::debug!(path = %path.display(), "created default configuration");
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PORTER_BIN_DIR") {
            self.bin_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PORTER_SRC_DIR") {
            self.src_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PORTER_CACHE_PATH") {
            self.cache_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PORTER_ARCHIVE_ADDR") {
            self.archive_addr = v;
        }
        if let Ok(v) = std::env::var("PORTER_UPLOAD_ADDR") {
            self.upload_addr = v;
        }
        if let Ok(v) = std::env::var("PORTER_MAINTAINER_NAME") {
            self.maintainer.name = v;
        }
        if let Ok(v) = std::env::var("PORTER_MAINTAINER_EMAIL") {
            self.maintainer.email = v;
        }
        if let Ok(v) = std::env::var("PORTER_SIGNING_KEY") {
            self.maintainer.signing_key = v;
        }
    }

    /// The maintainer entry in `Name <email>` format.
    pub fn maintainer_entry(&self) -> String {
        format!("{} <{}>", self.maintainer.name, self.maintainer.email)
    }
}
