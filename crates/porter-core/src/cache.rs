//! Client-side install cache: the ledger of installed aliases and the
//! install/remove state machine driving it.
//!
//! Files are always written to disk before the cache record is persisted;
//! external recovery tooling depends on that ordering. A crash between the
//! last file write and the cache persist leaves orphan files with no cache
//! entry, a documented limitation that is not reconciled here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{ArchiveApi, ClientError};
use crate::config::Config;
use crate::container::{Container, ContainerError};
use crate::meta::{MANIFEST_CANDIDATES, Meta, MetaError};

/// Virtual path prefix marking entries that a binary install places into
/// the bin directory. Stripped on disk.
pub const BIN_PREFIX: &str = "bin/";

/// Errors produced by cache and installer operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The alias is already registered; there is no upgrade-in-place.
    #[error("package {0} is already installed")]
    AlreadyInstalled(String),

    /// A binary package built for a different platform.
    #[error("package is not compatible (got: {got_os}/{got_arch} want: {want_os}/{want_arch})")]
    WrongTarget {
        /// OS the artifact was built for.
        got_os: String,
        /// Arch the artifact was built for.
        got_arch: String,
        /// OS of the running platform.
        want_os: String,
        /// Arch of the running platform.
        want_arch: String,
    },

    /// Remove of an alias that is not registered.
    #[error("package {0} is not installed")]
    NotInstalled(String),

    /// The container's manifest is missing or malformed.
    #[error(transparent)]
    Meta(#[from] MetaError),

    /// The container blob could not be decoded.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A failure talking to the archive.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The cache file is not valid JSON.
    #[error("invalid cache file: {0}")]
    Format(#[from] serde_json::Error),

    /// An I/O error while writing installed files or the cache itself.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One path the remover failed to delete, with the underlying error.
#[derive(Debug)]
pub struct RemoveFailure {
    /// The path that could not be deleted.
    pub path: PathBuf,
    /// The I/O error encountered.
    pub error: std::io::Error,
}

/// Result of a best-effort remove: deletions that succeeded and the soft
/// failures collected along the way. The cache entry is cleared either way.
#[derive(Debug, Default)]
pub struct RemoveOutcome {
    /// Paths that were deleted (or already gone).
    pub removed: Vec<PathBuf>,
    /// Paths that could not be deleted.
    pub failures: Vec<RemoveFailure>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    packages: BTreeMap<String, Vec<PathBuf>>,
}

/// The local ledger of installed packages: alias -> installed file paths.
#[derive(Debug)]
pub struct LocalCache {
    packages: BTreeMap<String, Vec<PathBuf>>,
    cache_path: PathBuf,
}

impl LocalCache {
    /// Open the cache at `path`. A missing file reads as an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the file exists but cannot be read or
    /// parsed.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let packages = match fs::read(path) {
            Ok(body) => serde_json::from_slice::<CacheFile>(&body)?.packages,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            packages,
            cache_path: path.to_path_buf(),
        })
    }

    fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(&CacheFile {
            packages: self.packages.clone(),
        })?;
        fs::write(&self.cache_path, body)?;
        Ok(())
    }

    /// Whether the alias is registered as installed.
    pub fn is_installed(&self, alias: &str) -> bool {
        self.packages.contains_key(alias)
    }

    /// Aliases currently registered, ordered.
    pub fn installed(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    /// Install a package from a `.pkg` file on disk.
    ///
    /// # Errors
    ///
    /// See [`LocalCache::install`].
    pub fn install_file(&mut self, pkg_path: &Path, config: &Config) -> Result<Meta, CacheError> {
        let container = Container::read_file(pkg_path)?;
        self.install(&container, config)
    }

    /// Install the latest release of `alias` for the running platform,
    /// fetched through the archive client.
    ///
    /// # Errors
    ///
    /// See [`LocalCache::install`], plus any [`ClientError`] from the fetch.
    pub async fn install_alias(
        &mut self,
        alias: &str,
        client: &dyn ArchiveApi,
        config: &Config,
    ) -> Result<Meta, CacheError> {
        let container = client
            .get_latest_release(alias, std::env::consts::OS, std::env::consts::ARCH)
            .await?;
        self.install(&container, config)
    }

    /// Install a decoded container.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::AlreadyInstalled`] when the alias is registered,
    /// [`CacheError::WrongTarget`] for a binary package built for another
    /// platform, and I/O or metadata errors otherwise. Conflicts are
    /// detected before any file-system mutation.
    pub fn install(&mut self, container: &Container, config: &Config) -> Result<Meta, CacheError> {
        self.install_for(container, config, std::env::consts::OS, std::env::consts::ARCH)
    }

    fn install_for(
        &mut self,
        container: &Container,
        config: &Config,
        platform_os: &str,
        platform_arch: &str,
    ) -> Result<Meta, CacheError> {
        let meta = container.meta()?;

        if self.packages.contains_key(&meta.alias) {
            return Err(CacheError::AlreadyInstalled(meta.alias));
        }

        let files = if meta.is_source() {
            install_source(container, &config.src_dir)?
        } else {
            if meta.target_os != platform_os || meta.target_arch != platform_arch {
                return Err(CacheError::WrongTarget {
                    got_os: meta.target_os,
                    got_arch: meta.target_arch,
                    want_os: platform_os.to_string(),
                    want_arch: platform_arch.to_string(),
                });
            }
            install_binary(container, &config.bin_dir)?
        };

        // Files land on disk first, the cache record second.
        self.packages.insert(meta.alias.clone(), files);
        self.persist()?;

        Ok(meta)
    }

    /// Remove an installed package: delete every recorded path best-effort,
    /// then drop the cache entry and persist.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotInstalled`] when the alias is absent; no
    /// mutation happens in that case. Individual delete failures do not
    /// abort the removal and are reported in the outcome.
    pub fn remove(&mut self, alias: &str) -> Result<RemoveOutcome, CacheError> {
        let files = self
            .packages
            .get(alias)
            .ok_or_else(|| CacheError::NotInstalled(alias.to_string()))?
            .clone();

        let mut outcome = RemoveOutcome::default();
        for file in files {
            match fs::remove_file(&file) {
                Ok(()) => outcome.removed.push(file),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    outcome.removed.push(file);
                }
                Err(err) => {
                    tracing::warn!(file = %file.display(), error = %err, "unable to delete file");
                    outcome.failures.push(RemoveFailure { path: file, error: err });
                }
            }
        }

        self.packages.remove(alias);
        self.persist()?;

        Ok(outcome)
    }

    /// List package aliases: the cache keys when `only_installed`, otherwise
    /// every alias the archive index knows.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the index fetch fails.
    pub async fn list(
        &self,
        only_installed: bool,
        client: &dyn ArchiveApi,
    ) -> Result<Vec<String>, CacheError> {
        if only_installed {
            return Ok(self.installed());
        }

        let index = client.get_index().await?;
        Ok(index.packages.keys().cloned().collect())
    }
}

fn is_manifest(path: &str) -> bool {
    MANIFEST_CANDIDATES.iter().any(|m| *m == path)
}

fn install_source(container: &Container, src_dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let mut files = Vec::new();
    for (path, content) in container.files() {
        if is_manifest(path) {
            continue;
        }

        let file_path = src_dir.join(path);
        tracing::trace!(path = %file_path.display(), "writing file");
        write_installed(&file_path, content, 0o640)?;
        files.push(file_path);
    }
    Ok(files)
}

fn install_binary(container: &Container, bin_dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let mut files = Vec::new();
    for (path, content) in container.files() {
        if is_manifest(path) {
            continue;
        }

        // Only entries under the reserved bin/ prefix are installed, with
        // the prefix stripped on disk.
        let Some(stripped) = path.strip_prefix(BIN_PREFIX) else {
            continue;
        };

        let file_path = bin_dir.join(stripped);
        tracing::trace!(path = %file_path.display(), "writing file");
        write_installed(&file_path, content, 0o750)?;
        files.push(file_path);
    }
    Ok(files)
}

fn write_installed(path: &Path, content: &[u8], mode: u32) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
