//! Package file naming grammar.
//!
//! The file name is the sole place that encodes a package's on-disk and
//! on-wire identity. Control and source packages are named
//! `<dashed-alias>[-src]_<version>.pkg`, binary packages
//! `<dashed-alias>_<version>_<os>_<arch>.pkg`.

use thiserror::Error;

/// Extension for package files.
pub const FILE_EXT: &str = "pkg";

const SRC_SUFFIX: &str = "src";

/// Errors produced when building or parsing a package file name.
#[derive(Error, Debug)]
pub enum NameError {
    /// A required component (alias, version, or os/arch for binaries) is empty.
    #[error("missing information to build package name")]
    MissingInformation,

    /// The file name does not match the naming grammar.
    #[error("invalid package file name: {0}")]
    InvalidFileName(String),
}

/// Discriminates what a package archive is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Scaffold-only archive holding a package definition, no manifest.
    Control,
    /// Archive shipping source code.
    Source,
    /// Archive shipping a compiled executable for one (os, arch).
    Binary,
}

/// Translate an alias (which may contain path separators) into the dashed
/// name used inside file names, appending the `-src` marker for source
/// packages.
pub fn dashed_name(alias: &str, is_src: bool) -> String {
    let name = alias.replace('/', "-");
    if is_src {
        format!("{name}-{SRC_SUFFIX}")
    } else {
        name
    }
}

/// Compute the canonical file name for the given package identity.
///
/// # Errors
///
/// Returns [`NameError::MissingInformation`] when alias or version is empty,
/// or when os/arch is empty for a binary package.
pub fn file_name(
    alias: &str,
    version: &str,
    os: &str,
    arch: &str,
    kind: PackageKind,
) -> Result<String, NameError> {
    if alias.is_empty() || version.is_empty() {
        return Err(NameError::MissingInformation);
    }

    let name = dashed_name(alias, kind == PackageKind::Source);
    match kind {
        PackageKind::Control | PackageKind::Source => {
            Ok(format!("{name}_{version}.{FILE_EXT}"))
        }
        PackageKind::Binary => {
            if os.is_empty() || arch.is_empty() {
                return Err(NameError::MissingInformation);
            }
            Ok(format!("{name}_{version}_{os}_{arch}.{FILE_EXT}"))
        }
    }
}

/// A parsed package file name.
///
/// Constructed only by [`FileName::parse`] so that downstream code branches
/// on the variant instead of re-inspecting the raw string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileName {
    /// `<name>_<version>.pkg`
    Control {
        /// Dashed package name.
        name: String,
        /// Release version string.
        version: String,
    },
    /// `<name>-src_<version>.pkg`
    Source {
        /// Dashed package name, including the `-src` marker.
        name: String,
        /// Release version string.
        version: String,
    },
    /// `<name>_<version>_<os>_<arch>.pkg`
    Binary {
        /// Dashed package name.
        name: String,
        /// Release version string.
        version: String,
        /// Target operating system.
        os: String,
        /// Target architecture.
        arch: String,
    },
}

impl FileName {
    /// Parse a package file name into its components.
    ///
    /// The grammar splits on `_` after stripping the `.pkg` extension: two
    /// segments mean control or source (a trailing `-src` on the first
    /// segment marks source), four mean binary.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::InvalidFileName`] for any other segment count.
    pub fn parse(file_name: &str) -> Result<Self, NameError> {
        let stem = file_name
            .strip_suffix(&format!(".{FILE_EXT}"))
            .unwrap_or(file_name);

        let parts: Vec<&str> = stem.split('_').collect();
        match parts.as_slice() {
            [name, version] => {
                if name.ends_with(&format!("-{SRC_SUFFIX}")) {
                    Ok(FileName::Source {
                        name: (*name).to_string(),
                        version: (*version).to_string(),
                    })
                } else {
                    Ok(FileName::Control {
                        name: (*name).to_string(),
                        version: (*version).to_string(),
                    })
                }
            }
            [name, version, os, arch] => Ok(FileName::Binary {
                name: (*name).to_string(),
                version: (*version).to_string(),
                os: (*os).to_string(),
                arch: (*arch).to_string(),
            }),
            _ => Err(NameError::InvalidFileName(file_name.to_string())),
        }
    }

    /// The package kind encoded in the name.
    pub fn kind(&self) -> PackageKind {
        match self {
            FileName::Control { .. } => PackageKind::Control,
            FileName::Source { .. } => PackageKind::Source,
            FileName::Binary { .. } => PackageKind::Binary,
        }
    }

    /// The dashed package name.
    pub fn name(&self) -> &str {
        match self {
            FileName::Control { name, .. }
            | FileName::Source { name, .. }
            | FileName::Binary { name, .. } => name,
        }
    }

    /// The release version string.
    pub fn version(&self) -> &str {
        match self {
            FileName::Control { version, .. }
            | FileName::Source { version, .. }
            | FileName::Binary { version, .. } => version,
        }
    }
}
