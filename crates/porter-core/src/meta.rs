//! Package metadata: the manifest embedded in every source/binary container
//! and the control metadata kept in a package's scaffold directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::Container;
use crate::name::PackageKind;

/// Canonical manifest path inside a container, decided at build time.
pub const MANIFEST_FILE: &str = "package.yaml";

/// Accepted manifest paths at the read boundary. The `.yml` variant is a
/// compatibility shim only; everything else in the pipeline uses
/// [`MANIFEST_FILE`].
pub const MANIFEST_CANDIDATES: [&str; 2] = ["package.yaml", "package.yml"];

/// Directory where porter control files live inside a package scaffold.
pub const CONTROL_DIR: &str = ".porter";

const CONTROL_META_FILE: &str = "metadata.yaml";

/// Errors produced when extracting or parsing package metadata.
#[derive(Error, Debug)]
pub enum MetaError {
    /// The container holds no manifest. Control containers always hit this.
    #[error("missing package definition (package.yaml)")]
    MissingManifest,

    /// The manifest exists but is not valid YAML for [`Meta`].
    #[error("invalid package definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An I/O error while reading control metadata.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The package manifest embedded inside every source and binary container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    /// The package alias, i.e. what users identify the package by.
    pub alias: String,
    /// Path of the file holding the program entry point. Empty for source
    /// packages.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub main: String,
    /// Name of the binary that will be installed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bin_name: String,
    /// Human description of the package.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Build targets: os -> list of arches.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, Vec<String>>,
    /// Concrete OS a built binary targets. Set at build time.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_os: String,
    /// Concrete arch a built binary targets. Set at build time.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_arch: String,
    /// Release version the artifact was built from.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_version: String,
}

impl Meta {
    /// A package is a source package iff it declares no entry point.
    ///
    /// This single predicate drives install strategy, kind derivation and
    /// archive path layout.
    pub fn is_source(&self) -> bool {
        self.main.is_empty()
    }

    /// The package kind derived from the manifest. Control containers carry
    /// no manifest, so this never yields [`PackageKind::Control`].
    pub fn kind(&self) -> PackageKind {
        if self.is_source() {
            PackageKind::Source
        } else {
            PackageKind::Binary
        }
    }
}

impl Container {
    /// Extract and parse the embedded manifest.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::MissingManifest`] when neither manifest variant
    /// is present, or [`MetaError::Parse`] when the YAML is invalid.
    pub fn meta(&self) -> Result<Meta, MetaError> {
        let raw = MANIFEST_CANDIDATES
            .iter()
            .find_map(|p| self.get(p))
            .ok_or(MetaError::MissingManifest)?;
        Ok(serde_yaml::from_slice(raw)?)
    }
}

/// Control metadata describing a package scaffold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlMeta {
    /// The upstream import path the scaffold was created from.
    pub import_path: String,
    /// Maintainers responsible for uploading and managing the package.
    pub maintainers: Vec<String>,
    /// Packages that must be pulled before building this one.
    pub build_dependencies: Vec<String>,
    /// The packages this control package builds.
    pub packages: Vec<Meta>,
}

/// Write control metadata into the control directory at `dir`.
///
/// # Errors
///
/// Returns [`MetaError::Io`] on write failure.
pub fn write_control_meta(meta: &ControlMeta, dir: &Path) -> Result<(), MetaError> {
    let body = serde_yaml::to_string(meta)?;
    fs::write(dir.join(CONTROL_META_FILE), body)?;
    Ok(())
}

/// Read control metadata from the control directory at `dir`, accepting the
/// `.yml` spelling as a read-side shim.
///
/// # Errors
///
/// Returns [`MetaError::Io`] when no metadata file exists or reading fails.
pub fn read_control_meta(dir: &Path) -> Result<ControlMeta, MetaError> {
    let path = find_by_extensions(&dir.join(CONTROL_META_FILE), &["yaml", "yml"])?;
    let body = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&body)?)
}

/// Resolve `path` against a list of alternative extensions, returning the
/// first spelling that exists on disk.
pub(crate) fn find_by_extensions(path: &Path, exts: &[&str]) -> Result<PathBuf, std::io::Error> {
    for ext in exts {
        let candidate = path.with_extension(ext);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no file found for {}", path.display()),
    ))
}
