//! The `.pkg` container codec.
//!
//! A container is a plain uncompressed tar stream of (virtual path, content)
//! pairs. The codec is source-agnostic: the server decodes containers from
//! in-memory upload bytes, the client from files on disk.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Errors produced by the container codec.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The target file exists and overwrite was not requested.
    #[error("container already exists: {0}")]
    AlreadyExists(PathBuf),

    /// An entry's archive path would escape the archive root.
    #[error("archive path escapes the archive root: {0}")]
    PathEscape(String),

    /// An I/O error surfaced unchanged; retries belong to the caller.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One file destined for a container: where it lives on disk and the virtual
/// path it gets inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path of the source file on disk.
    pub file_path: PathBuf,
    /// Virtual path inside the archive.
    pub archive_path: String,
}

/// Collect the entries for every file under `dir`, skipping any file or
/// directory whose name appears in `excluded`. `prefix` is prepended to each
/// archive path.
///
/// # Errors
///
/// Returns [`ContainerError::Io`] if the directory walk fails.
pub fn create_entries(
    dir: &Path,
    prefix: &str,
    excluded: &[String],
) -> Result<Vec<Entry>, ContainerError> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            let skip = excluded.iter().any(|x| *x == name);
            if skip {
                tracing::trace!(file = %e.path().display(), "skipping file");
            }
            !skip
        });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let archive_path = if prefix.is_empty() {
            rel.to_string_lossy().into_owned()
        } else {
            format!("{prefix}/{}", rel.display())
        };

        entries.push(Entry {
            file_path: entry.path().to_path_buf(),
            archive_path,
        });
    }

    Ok(entries)
}

fn validate_archive_path(path: &str) -> Result<(), ContainerError> {
    let p = Path::new(path);
    let escapes = path.is_empty()
        || p.is_absolute()
        || p.components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(ContainerError::PathEscape(path.to_string()));
    }
    Ok(())
}

/// Write a container holding the given entries to `path`.
///
/// The whole tar stream is assembled in memory and persisted with a single
/// final write.
///
/// # Errors
///
/// Returns [`ContainerError::AlreadyExists`] when `path` exists and
/// `overwrite` is false, [`ContainerError::PathEscape`] for an invalid
/// archive path, or [`ContainerError::Io`] for any I/O failure.
pub fn write(path: &Path, entries: &[Entry], overwrite: bool) -> Result<(), ContainerError> {
    if !overwrite && path.exists() {
        return Err(ContainerError::AlreadyExists(path.to_path_buf()));
    }

    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        validate_archive_path(&entry.archive_path)?;

        tracing::trace!(
            file = %entry.file_path.display(),
            archive = %entry.archive_path,
            "writing entry"
        );
        let body = fs::read(&entry.file_path)?;

        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, &entry.archive_path, body.as_slice())?;
    }

    let blob = builder.into_inner()?;
    fs::write(path, blob)?;
    Ok(())
}

/// A decoded container: an ordered map of virtual path to content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    files: BTreeMap<String, Vec<u8>>,
}

impl Container {
    /// Decode a container from any byte source.
    ///
    /// Entry paths are validated here, not at extraction: a decoded
    /// container never holds a path that could land outside the directory
    /// it is later installed into.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Io`] if the tar stream is malformed or the
    /// source fails, and [`ContainerError::PathEscape`] when an entry path
    /// is absolute or climbs out of the archive root. A well-formed stream
    /// missing some expected entry is not an error; callers observe plain
    /// key absence.
    pub fn read<R: Read>(reader: R) -> Result<Self, ContainerError> {
        let mut archive = tar::Archive::new(reader);
        let mut files = BTreeMap::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.to_string_lossy().into_owned();
            validate_archive_path(&path)?;
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            files.insert(path, content);
        }

        Ok(Self { files })
    }

    /// Decode a container from a file on disk.
    ///
    /// # Errors
    ///
    /// See [`Container::read`].
    pub fn read_file(path: &Path) -> Result<Self, ContainerError> {
        let blob = fs::read(path)?;
        Self::read(blob.as_slice())
    }

    /// Content of the entry at `path`, if present.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// All entries, ordered by virtual path.
    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write as _;

    fn fixture_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            let mut f = File::create(path).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        }
        dir
    }

    #[test]
    fn write_then_read_round_trips() {
        let src = fixture_dir(&[("a.txt", "alpha"), ("sub/b.txt", "beta")]);
        let entries = vec![
            Entry {
                file_path: src.path().join("a.txt"),
                archive_path: "a.txt".to_string(),
            },
            Entry {
                file_path: src.path().join("sub/b.txt"),
                archive_path: "sub/b.txt".to_string(),
            },
        ];

        let out = tempfile::tempdir().unwrap();
        let pkg = out.path().join("test_1.0-1.pkg");
        write(&pkg, &entries, false).unwrap();

        let container = Container::read_file(&pkg).unwrap();
        assert_eq!(container.files().len(), 2);
        assert_eq!(container.get("a.txt"), Some("alpha".as_bytes()));
        assert_eq!(container.get("sub/b.txt"), Some("beta".as_bytes()));
        assert_eq!(container.get("missing"), None);
    }

    #[test]
    fn read_accepts_in_memory_source() {
        let src = fixture_dir(&[("a.txt", "alpha")]);
        let entries = vec![Entry {
            file_path: src.path().join("a.txt"),
            archive_path: "a.txt".to_string(),
        }];

        let out = tempfile::tempdir().unwrap();
        let pkg = out.path().join("mem.pkg");
        write(&pkg, &entries, false).unwrap();

        let blob = fs::read(&pkg).unwrap();
        let container = Container::read(blob.as_slice()).unwrap();
        assert_eq!(container.get("a.txt"), Some("alpha".as_bytes()));
    }

    #[test]
    fn write_refuses_existing_without_overwrite() {
        let src = fixture_dir(&[("a.txt", "alpha")]);
        let entries = vec![Entry {
            file_path: src.path().join("a.txt"),
            archive_path: "a.txt".to_string(),
        }];

        let out = tempfile::tempdir().unwrap();
        let pkg = out.path().join("dup.pkg");
        write(&pkg, &entries, false).unwrap();

        let err = write(&pkg, &entries, false).unwrap_err();
        assert!(matches!(err, ContainerError::AlreadyExists(_)));

        // And succeeds when overwrite is requested.
        write(&pkg, &entries, true).unwrap();
    }

    #[test]
    fn write_rejects_escaping_paths() {
        let src = fixture_dir(&[("a.txt", "alpha")]);
        let out = tempfile::tempdir().unwrap();

        for bad in ["../evil", "/abs/path", ""] {
            let entries = vec![Entry {
                file_path: src.path().join("a.txt"),
                archive_path: bad.to_string(),
            }];
            let err = write(&out.path().join("x.pkg"), &entries, true).unwrap_err();
            assert!(matches!(err, ContainerError::PathEscape(_)), "{bad:?}");
        }
    }

    // Bypasses the write-side checks the way a hostile upload would: the
    // entry name is planted straight into the GNU header bytes.
    fn forged_tar(entry_name: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let manifest = b"alias: evil/pkg\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(manifest.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "package.yaml", manifest.as_slice())
            .unwrap();

        let body = b"pwned";
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.as_gnu_mut().unwrap().name[..entry_name.len()]
            .copy_from_slice(entry_name.as_bytes());
        header.set_cksum();
        builder.append(&header, body.as_slice()).unwrap();

        builder.into_inner().unwrap()
    }

    #[test]
    fn read_rejects_forged_escaping_entry() {
        for bad in ["../escaped.txt", "/abs/escaped.txt", "a/../../escaped.txt"] {
            let blob = forged_tar(bad);
            let err = Container::read(blob.as_slice()).unwrap_err();
            assert!(matches!(err, ContainerError::PathEscape(_)), "{bad:?}");
        }
    }

    #[test]
    fn create_entries_walks_recursively_and_excludes() {
        let src = fixture_dir(&[
            ("main.go", "package main"),
            ("lib/util.go", "package lib"),
            ("ignored.tmp", "x"),
        ]);

        let entries =
            create_entries(src.path(), "", std::slice::from_ref(&"ignored.tmp".to_string()))
                .unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.archive_path.as_str()).collect();
        assert_eq!(paths, vec!["lib/util.go", "main.go"]);
    }

    #[test]
    fn create_entries_applies_prefix() {
        let src = fixture_dir(&[("main.go", "package main")]);
        let entries = create_entries(src.path(), "github.com/foo/bar", &[]).unwrap();
        assert_eq!(entries[0].archive_path, "github.com/foo/bar/main.go");
    }
}
