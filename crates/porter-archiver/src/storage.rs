//! Abstract durable object store for the archive, plus the FTP-backed
//! production implementation.

use async_trait::async_trait;
use opendal::services;
use opendal::{ErrorKind, Operator};
use thiserror::Error;

use porter_core::index::{ArchiveIndex, INDEX_FILE};

/// Errors produced by storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A backend-level failure (connection, transfer, permissions).
    #[error("storage backend error: {0}")]
    Backend(#[from] opendal::Error),

    /// The stored index object is not valid JSON.
    #[error("invalid index object: {0}")]
    Format(#[from] serde_json::Error),
}

/// A durable object store holding the archive's artifacts and its index.
///
/// Every call transfers a full object; no partial or range writes.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Retrieve the index, or an empty one when no index object exists yet.
    async fn get_index(&self) -> Result<ArchiveIndex, StorageError>;

    /// Serialize and upload the full index, overwriting any prior version.
    async fn update_index(&self, index: &ArchiveIndex) -> Result<(), StorageError>;

    /// Write `file` at `path`, creating missing intermediate prefixes and
    /// overwriting any existing object.
    async fn upload(&self, file: &[u8], path: &str) -> Result<(), StorageError>;
}

/// Storage over a single persistent FTP session, rooted at a configurable
/// base directory.
#[derive(Debug, Clone)]
pub struct FtpStorage {
    op: Operator,
}

impl FtpStorage {
    /// Open an FTP-backed store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when the operator cannot be built.
    pub fn new(host: &str, user: &str, pass: &str, base_dir: &str) -> Result<Self, StorageError> {
        let mut builder = services::Ftp::default();
        builder.endpoint(host);
        builder.user(user);
        builder.password(pass);
        if !base_dir.is_empty() {
            builder.root(base_dir);
        }

        Ok(Self {
            op: Operator::new(builder)?.finish(),
        })
    }
}

#[async_trait]
impl Storage for FtpStorage {
    async fn get_index(&self) -> Result<ArchiveIndex, StorageError> {
        match self.op.read(INDEX_FILE).await {
            Ok(body) => Ok(serde_json::from_slice(&body)?),
            // No index exists yet; start from an empty catalog.
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(ArchiveIndex::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_index(&self, index: &ArchiveIndex) -> Result<(), StorageError> {
        let body = serde_json::to_vec(index)?;
        self.upload(&body, INDEX_FILE).await
    }

    async fn upload(&self, file: &[u8], path: &str) -> Result<(), StorageError> {
        // The operator creates missing parent directories on write.
        self.op.write(path, file.to_vec()).await?;
        Ok(())
    }
}
