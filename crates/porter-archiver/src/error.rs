//! Archiver error type and its HTTP status mapping.
//!
//! Wire contract: 400 for malformed or unsigned input, 500 for trust,
//! signing and storage failures.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use porter_core::container::ContainerError;
use porter_core::meta::MetaError;
use porter_core::name::NameError;

use crate::keyring::KeyringError;
use crate::storage::StorageError;

/// Everything that can go wrong while handling an upload.
#[derive(Error, Debug)]
pub enum ArchiverError {
    /// A required multipart field was absent from the request.
    #[error("missing multipart field {0}")]
    MissingPart(&'static str),

    /// The multipart payload itself could not be read.
    #[error("malformed multipart payload: {0}")]
    Multipart(#[from] MultipartError),

    /// The maintainer signature did not verify.
    #[error("error while checking package signature: {0}")]
    Trust(#[from] KeyringError),

    /// The package blob is not a valid container.
    #[error("error while reading package: {0}")]
    Container(#[from] ContainerError),

    /// The container holds no usable package definition.
    #[error(transparent)]
    Meta(#[from] MetaError),

    /// The manifest does not carry enough identity to name the artifact.
    #[error(transparent)]
    Name(#[from] NameError),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ArchiverError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ArchiverError::MissingPart(_)
            | ArchiverError::Multipart(_)
            | ArchiverError::Container(_)
            | ArchiverError::Meta(_)
            | ArchiverError::Name(_) => StatusCode::BAD_REQUEST,
            ArchiverError::Trust(_) | ArchiverError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ArchiverError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "upload rejected");
        } else {
            tracing::warn!(error = %self, "upload rejected");
        }
        status.into_response()
    }
}
