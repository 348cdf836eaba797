//! The archive index: the server-side catalog of published releases.
//!
//! The index is a JSON document stored at a well-known backend path
//! (`index.json`), shape
//! `{ "packages": { alias: { "releases": { version: [ {os, arch, path} ] }, "latest_release": v } } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known storage path of the index object.
pub const INDEX_FILE: &str = "index.json";

/// One build artifact's location inside the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRelease {
    /// Target operating system; empty for source artifacts.
    #[serde(default)]
    pub os: String,
    /// Target architecture; empty for source artifacts.
    #[serde(default)]
    pub arch: String,
    /// Storage path of the artifact, relative to the archive root.
    pub path: String,
}

/// Release history of one package alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePackage {
    /// Per-version artifact lists.
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<ArchiveRelease>>,
    /// Version key of the most recently uploaded release. Always references
    /// an existing key in `releases`.
    #[serde(default)]
    pub latest_release: String,
}

impl ArchivePackage {
    /// Record an artifact under `version` and move the latest-release
    /// pointer there.
    ///
    /// Binary packages hold at most one artifact per (os, arch) pair: an
    /// existing entry for the same pair is replaced, not duplicated.
    pub fn add_release(&mut self, version: &str, release: ArchiveRelease) {
        let artifacts = self.releases.entry(version.to_string()).or_default();
        if let Some(existing) = artifacts
            .iter_mut()
            .find(|r| r.os == release.os && r.arch == release.arch)
        {
            *existing = release;
        } else {
            artifacts.push(release);
        }
        self.latest_release = version.to_string();
    }
}

/// The server-side catalog, keyed by package alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    /// All packages published on the archive.
    #[serde(default)]
    pub packages: BTreeMap<String, ArchivePackage>,
}

impl ArchiveIndex {
    /// Record an artifact for `alias`, creating the package entry on first
    /// upload.
    pub fn add_release(&mut self, alias: &str, version: &str, release: ArchiveRelease) {
        self.packages
            .entry(alias.to_string())
            .or_default()
            .add_release(version, release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_release_creates_package_and_sets_latest() {
        let mut index = ArchiveIndex::default();
        index.add_release(
            "a/b",
            "1.0-1",
            ArchiveRelease {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                path: "a/b/a-b_1.0-1_linux_amd64.pkg".to_string(),
            },
        );

        let pkg = &index.packages["a/b"];
        assert_eq!(pkg.latest_release, "1.0-1");
        assert_eq!(pkg.releases["1.0-1"].len(), 1);
        assert!(pkg.releases.contains_key(&pkg.latest_release));
    }

    #[test]
    fn add_release_replaces_same_target_pair() {
        let mut pkg = ArchivePackage::default();
        pkg.add_release(
            "1.0-1",
            ArchiveRelease {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                path: "first".to_string(),
            },
        );
        pkg.add_release(
            "1.0-1",
            ArchiveRelease {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                path: "second".to_string(),
            },
        );
        pkg.add_release(
            "1.0-1",
            ArchiveRelease {
                os: "linux".to_string(),
                arch: "arm64".to_string(),
                path: "third".to_string(),
            },
        );

        let artifacts = &pkg.releases["1.0-1"];
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].path, "second");
    }

    #[test]
    fn json_wire_shape_is_stable() {
        let mut index = ArchiveIndex::default();
        index.add_release(
            "a/b",
            "1.0-1",
            ArchiveRelease {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                path: "a/b/a-b_1.0-1_linux_amd64.pkg".to_string(),
            },
        );

        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "packages": {
                    "a/b": {
                        "releases": {
                            "1.0-1": [
                                {"os": "linux", "arch": "amd64", "path": "a/b/a-b_1.0-1_linux_amd64.pkg"}
                            ]
                        },
                        "latest_release": "1.0-1"
                    }
                }
            })
        );

        let decoded: ArchiveIndex = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, index);
    }

    #[test]
    fn empty_fields_tolerated_on_decode() {
        let decoded: ArchiveIndex = serde_json::from_str(r#"{"packages":{}}"#).unwrap();
        assert!(decoded.packages.is_empty());
    }
}
