//! The upload pipeline: authenticate, decode, name, counter-sign, persist,
//! index. Terminal on first failure.

use std::sync::Arc;

use tokio::sync::Mutex;

use porter_core::container::Container;
use porter_core::index::{ArchiveIndex, ArchiveRelease};
use porter_core::name;

use crate::error::ArchiverError;
use crate::keyring::Keyring;
use crate::signer::Sign;
use crate::storage::{Storage, StorageError};

/// The archive's upload pipeline and its shared state.
///
/// The index is loaded once at startup and owned behind a single mutex; the
/// lock is held for the whole read-modify-write-persist cycle so concurrent
/// uploads to the same alias serialize instead of losing releases.
pub struct Archiver {
    keyring: Arc<dyn Keyring>,
    signer: Arc<dyn Sign>,
    storage: Arc<dyn Storage>,
    index: Mutex<ArchiveIndex>,
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver").finish_non_exhaustive()
    }
}

impl Archiver {
    /// Build the pipeline, loading the existing index from storage (an
    /// empty one when the archive is fresh).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the index cannot be fetched.
    pub async fn new(
        keyring: Arc<dyn Keyring>,
        signer: Arc<dyn Sign>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, StorageError> {
        let index = storage.get_index().await?;
        tracing::debug!(count = index.packages.len(), "loaded packages index");

        Ok(Self {
            keyring,
            signer,
            storage,
            index: Mutex::new(index),
        })
    }

    /// Run the pipeline for one uploaded package and its maintainer
    /// signature.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's [`ArchiverError`]; no state is
    /// mutated before the signature verifies.
    pub async fn handle_upload(
        &self,
        pkg_bytes: &[u8],
        signature: &[u8],
    ) -> Result<(), ArchiverError> {
        // Authenticate before touching anything else.
        let maintainer = self.keyring.check_signature(pkg_bytes, signature)?;
        tracing::info!(maintainer = %maintainer.name, "accepted package");

        // Decode and classify. Control containers carry no manifest and
        // cannot pass this gate.
        let container = Container::read(pkg_bytes)?;
        let meta = container.meta()?;

        tracing::debug!(
            alias = %meta.alias,
            version = %meta.release_version,
            os = %meta.target_os,
            arch = %meta.target_arch,
            "uploading package"
        );

        let file_name = name::file_name(
            &meta.alias,
            &meta.release_version,
            &meta.target_os,
            &meta.target_arch,
            meta.kind(),
        )?;
        let storage_path = format!("{}/{file_name}", meta.alias);

        // Counter-sign, then persist artifact and signature side by side.
        let archive_sig = self.signer.sign(pkg_bytes);
        self.storage.upload(pkg_bytes, &storage_path).await?;
        self.storage
            .upload(&archive_sig, &format!("{storage_path}.asc"))
            .await?;

        // Reflect the release in the index. The lock spans the mutation and
        // the persist, serializing concurrent uploads.
        {
            let mut index = self.index.lock().await;
            index.add_release(
                &meta.alias,
                &meta.release_version,
                ArchiveRelease {
                    os: meta.target_os.clone(),
                    arch: meta.target_arch.clone(),
                    path: storage_path,
                },
            );
            self.storage.update_index(&index).await?;
        }

        tracing::info!(
            alias = %meta.alias,
            version = %meta.release_version,
            "successfully uploaded package & signature"
        );
        Ok(())
    }

    /// Snapshot of the current in-memory index.
    pub async fn index(&self) -> ArchiveIndex {
        self.index.lock().await.clone()
    }
}
