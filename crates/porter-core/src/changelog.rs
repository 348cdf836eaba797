//! Human release history kept alongside a package scaffold.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CHANGELOG_FILE: &str = "changelog.yaml";

/// Errors produced when reading or writing a changelog.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// The changelog holds no releases.
    #[error("changelog has no releases")]
    Empty,

    /// The changelog file is not valid YAML.
    #[error("invalid changelog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An I/O error while reading or writing the changelog file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One released version of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogRelease {
    /// The package version, e.g. `1.2.0-1` for the initial packaging of
    /// upstream version `1.2.0`.
    pub version: String,
    /// Who took care of the release upload.
    pub uploader: String,
    /// Human descriptions of the changes applied since the last release.
    pub changes: Vec<String>,
}

/// Append-only sequence of releases; the last element is the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Changelog {
    /// All releases, oldest first.
    pub releases: Vec<ChangelogRelease>,
}

impl Changelog {
    /// Create a brand new changelog seeded with the initial packaging
    /// release `<initial_version>-1`.
    pub fn new(initial_version: &str, uploader: &str) -> Self {
        Self {
            releases: vec![ChangelogRelease {
                version: format!("{initial_version}-1"),
                uploader: uploader.to_string(),
                changes: vec!["Initial packaging".to_string()],
            }],
        }
    }

    /// The latest release.
    ///
    /// # Errors
    ///
    /// Returns [`ChangelogError::Empty`] when no release has been recorded.
    pub fn last_release(&self) -> Result<&ChangelogRelease, ChangelogError> {
        self.releases.last().ok_or(ChangelogError::Empty)
    }

    /// Record a new release at the end of the history.
    pub fn append(&mut self, release: ChangelogRelease) {
        self.releases.push(release);
    }
}

/// Write the changelog into the control directory at `dir`.
///
/// # Errors
///
/// Returns [`ChangelogError::Io`] on write failure.
pub fn write_changelog(changelog: &Changelog, dir: &Path) -> Result<(), ChangelogError> {
    let body = serde_yaml::to_string(changelog)?;
    fs::write(dir.join(CHANGELOG_FILE), body)?;
    Ok(())
}

/// Read the changelog from the control directory at `dir`.
///
/// # Errors
///
/// Returns [`ChangelogError::Io`] when the file is missing or unreadable.
pub fn read_changelog(dir: &Path) -> Result<Changelog, ChangelogError> {
    let body = fs::read_to_string(dir.join(CHANGELOG_FILE))?;
    Ok(serde_yaml::from_str(&body)?)
}
