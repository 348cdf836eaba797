//! The archive's own signing service.
//!
//! Counter-signs every accepted package so clients can verify "this artifact
//! passed through the archive", independently of the maintainer signature.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signer as _, SigningKey};
use thiserror::Error;

/// Errors produced by the signing service.
#[derive(Error, Debug)]
pub enum SignError {
    /// The key file does not hold a base64-encoded 32-byte ed25519 key.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The key file could not be read.
    #[error("unable to load signing key: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can produce a detached signature over arbitrary bytes.
pub trait Sign: Send + Sync {
    /// Sign the message with the configured key. The result is the base64
    /// text of the detached signature.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Ed25519 signer over a private key loaded once at process start.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer").finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    /// Load the signer from a file holding a base64-encoded 32-byte ed25519
    /// secret key.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] when the file is unreadable or malformed.
    pub fn from_key_file(path: &Path) -> Result<Self, SignError> {
        let body = fs::read_to_string(path)?;
        Self::from_base64(body.trim())
    }

    /// Build the signer from base64-encoded key material.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] for malformed material.
    pub fn from_base64(encoded: &str) -> Result<Self, SignError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SignError::InvalidKey("key must be 32 bytes".to_string()))?;
        Ok(Self {
            key: SigningKey::from_bytes(&arr),
        })
    }

    /// The verifying half of the loaded key, base64-encoded.
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.key.verifying_key().to_bytes())
    }
}

impl Sign for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature = self.key.sign(message);
        BASE64.encode(signature.to_bytes()).into_bytes()
    }
}
