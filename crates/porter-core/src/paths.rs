//! Well-known client-side paths, all rooted at the porter home directory.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the porter home directory, or None if the user's home cannot be
/// resolved.
pub fn try_porter_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("PORTER_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".porter"))
}

/// Returns the canonical porter home directory (`~/.porter`).
///
/// # Panics
///
/// Panics if neither `PORTER_HOME` is set nor the user's home directory can
/// be resolved.
pub fn porter_home() -> PathBuf {
    try_porter_home().expect("Could not determine home directory. Set PORTER_HOME to override.")
}

/// Configuration file path: ~/.porter/config.yaml
pub fn config_path() -> PathBuf {
    porter_home().join("config.yaml")
}

/// Local cache file: ~/.porter/cache.json
pub fn cache_path() -> PathBuf {
    porter_home().join("cache.json")
}

/// Binary installation target: ~/.porter/bin
pub fn bin_dir() -> PathBuf {
    porter_home().join("bin")
}

/// Source installation target: ~/.porter/src
pub fn src_dir() -> PathBuf {
    porter_home().join("src")
}
