//! Read-side archive client: fetches the index and downloads release
//! containers over HTTP.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::container::{Container, ContainerError};
use crate::index::{ArchiveIndex, ArchiveRelease, INDEX_FILE};

/// Errors produced by the archive client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The archive knows no package under the given alias.
    #[error("package {0} doesn't exist")]
    UnknownPackage(String),

    /// The latest release has no artifact for the requested platform.
    #[error("no release of {alias} for {os}/{arch}")]
    NoMatchingRelease {
        /// Requested package alias.
        alias: String,
        /// Requested operating system.
        os: String,
        /// Requested architecture.
        arch: String,
    },

    /// The archive answered with a non-success status.
    #[error("archive returned status {0}")]
    Status(u16),

    /// A transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The downloaded blob is not a valid container.
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Interface to an archive's read side.
#[async_trait]
pub trait ArchiveApi: Send + Sync {
    /// Fetch the up-to-date archive index.
    async fn get_index(&self) -> Result<ArchiveIndex, ClientError>;

    /// The available releases of the given package.
    async fn get_releases(
        &self,
        alias: &str,
    ) -> Result<BTreeMap<String, Vec<ArchiveRelease>>, ClientError>;

    /// Download and decode the latest release of `alias` for the given
    /// platform. Source packages have a single artifact and match any
    /// platform.
    async fn get_latest_release(
        &self,
        alias: &str,
        os: &str,
        arch: &str,
    ) -> Result<Container, ClientError>;
}

/// HTTP implementation of [`ArchiveApi`].
#[derive(Debug, Clone)]
pub struct HttpArchiveClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpArchiveClient {
    /// Create a client for the archive rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] when the underlying HTTP client cannot
    /// be constructed.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .user_agent(crate::USER_AGENT)
                .build()?,
        })
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status().as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ArchiveApi for HttpArchiveClient {
    async fn get_index(&self) -> Result<ArchiveIndex, ClientError> {
        let url = format!("{}/{INDEX_FILE}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }

    async fn get_releases(
        &self,
        alias: &str,
    ) -> Result<BTreeMap<String, Vec<ArchiveRelease>>, ClientError> {
        let index = self.get_index().await?;
        index
            .packages
            .get(alias)
            .map(|p| p.releases.clone())
            .ok_or_else(|| ClientError::UnknownPackage(alias.to_string()))
    }

    async fn get_latest_release(
        &self,
        alias: &str,
        os: &str,
        arch: &str,
    ) -> Result<Container, ClientError> {
        let index = self.get_index().await?;
        let package = index
            .packages
            .get(alias)
            .ok_or_else(|| ClientError::UnknownPackage(alias.to_string()))?;

        let no_match = || ClientError::NoMatchingRelease {
            alias: alias.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let artifacts = package
            .releases
            .get(&package.latest_release)
            .ok_or_else(no_match)?;

        // Source packages carry exactly one artifact; binary packages match
        // on (os, arch).
        let release = if artifacts.len() == 1 && artifacts[0].os.is_empty() {
            &artifacts[0]
        } else {
            artifacts
                .iter()
                .find(|r| r.os == os && r.arch == arch)
                .ok_or_else(no_match)?
        };

        tracing::debug!(alias, path = %release.path, "downloading release");
        let blob = self.fetch(&release.path).await?;
        Ok(Container::read(blob.as_slice())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{self, Entry};
    use crate::meta::MANIFEST_FILE;

    const INDEX_JSON: &str = r#"{
        "packages": {
            "a/b": {
                "releases": {
                    "1.0-1": [
                        {"os": "linux", "arch": "amd64", "path": "a/b/a-b_1.0-1_linux_amd64.pkg"},
                        {"os": "darwin", "arch": "arm64", "path": "a/b/a-b_1.0-1_darwin_arm64.pkg"}
                    ]
                },
                "latest_release": "1.0-1"
            },
            "src/only": {
                "releases": {
                    "2.0-1": [
                        {"os": "", "arch": "", "path": "src/only/src-only-src_2.0-1.pkg"}
                    ]
                },
                "latest_release": "2.0-1"
            }
        }
    }"#;

    fn fixture_container() -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.yaml");
        std::fs::write(&manifest, "alias: a/b\nmain: cmd/main.go\n").unwrap();
        let pkg = dir.path().join("fixture.pkg");
        container::write(
            &pkg,
            &[Entry {
                file_path: manifest,
                archive_path: MANIFEST_FILE.to_string(),
            }],
            false,
        )
        .unwrap();
        std::fs::read(&pkg).unwrap()
    }

    #[tokio::test]
    async fn get_index_decodes_catalog() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(INDEX_JSON)
            .create_async()
            .await;

        let client = HttpArchiveClient::new(&server.url()).unwrap();
        let index = client.get_index().await.unwrap();
        assert_eq!(index.packages.len(), 2);
        assert_eq!(index.packages["a/b"].latest_release, "1.0-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_releases_unknown_alias_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(INDEX_JSON)
            .create_async()
            .await;

        let client = HttpArchiveClient::new(&server.url()).unwrap();
        let err = client.get_releases("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownPackage(_)));
    }

    #[tokio::test]
    async fn get_latest_release_matches_platform() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(INDEX_JSON)
            .create_async()
            .await;
        let download = server
            .mock("GET", "/a/b/a-b_1.0-1_linux_amd64.pkg")
            .with_status(200)
            .with_body(fixture_container())
            .create_async()
            .await;

        let client = HttpArchiveClient::new(&server.url()).unwrap();
        let container = client
            .get_latest_release("a/b", "linux", "amd64")
            .await
            .unwrap();
        assert_eq!(container.meta().unwrap().alias, "a/b");
        download.assert_async().await;
    }

    #[tokio::test]
    async fn get_latest_release_source_ignores_platform() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(INDEX_JSON)
            .create_async()
            .await;
        server
            .mock("GET", "/src/only/src-only-src_2.0-1.pkg")
            .with_status(200)
            .with_body(fixture_container())
            .create_async()
            .await;

        let client = HttpArchiveClient::new(&server.url()).unwrap();
        let result = client.get_latest_release("src/only", "plan9", "mips").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn get_latest_release_no_platform_match_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(INDEX_JSON)
            .create_async()
            .await;

        let client = HttpArchiveClient::new(&server.url()).unwrap();
        let err = client
            .get_latest_release("a/b", "plan9", "mips")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoMatchingRelease { .. }));
    }

    #[tokio::test]
    async fn non_success_status_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index.json")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpArchiveClient::new(&server.url()).unwrap();
        let err = client.get_index().await.unwrap_err();
        assert!(matches!(err, ClientError::Status(503)));
    }
}
