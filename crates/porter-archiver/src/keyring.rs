//! The maintainer keyring: verifies that an uploaded package was signed by
//! a known maintainer.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Errors produced by keyring loading and signature verification.
#[derive(Error, Debug)]
pub enum KeyringError {
    /// The signature does not verify against any maintainer key.
    #[error("signature does not match any known maintainer")]
    UnknownSigner,

    /// The detached signature is not base64 text over 64 bytes.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// A keyring line could not be parsed.
    #[error("unable to load keyring {path}: invalid entry on line {line}")]
    InvalidEntry {
        /// Keyring file path.
        path: String,
        /// 1-based line number.
        line: usize,
    },

    /// The keyring file could not be read.
    #[error("unable to load keyring: {0}")]
    Io(#[from] std::io::Error),
}

/// A verified maintainer identity. Produced only as the output of signature
/// verification, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    /// Display name as recorded in the keyring.
    pub name: String,
}

/// Something that can verify a detached signature against the maintainer
/// key ring.
pub trait Keyring: Send + Sync {
    /// Check `signature` against `content` and return the signer, or a
    /// trust error when no identity matches.
    fn check_signature(&self, content: &[u8], signature: &[u8]) -> Result<Maintainer, KeyringError>;
}

/// Keyring backed by a text file, one `<base64 public key> <display name>`
/// entry per line. Blank lines and `#` comments are skipped.
pub struct FileKeyring {
    identities: Vec<(VerifyingKey, String)>,
}

impl std::fmt::Debug for FileKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKeyring")
            .field("identities", &self.identities.len())
            .finish()
    }
}

impl FileKeyring {
    /// Load the keyring from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyringError`] when the file is unreadable or an entry is
    /// malformed.
    pub fn from_file(path: &Path) -> Result<Self, KeyringError> {
        let body = fs::read_to_string(path)?;
        Self::parse(&body, &path.display().to_string())
    }

    fn parse(body: &str, origin: &str) -> Result<Self, KeyringError> {
        let mut identities = Vec::new();

        for (i, raw) in body.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let invalid = || KeyringError::InvalidEntry {
                path: origin.to_string(),
                line: i + 1,
            };

            let (encoded, name) = line.split_once(' ').ok_or_else(invalid)?;
            let bytes = BASE64.decode(encoded).map_err(|_| invalid())?;
            let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| invalid())?;
            let key = VerifyingKey::from_bytes(&arr).map_err(|_| invalid())?;
            identities.push((key, name.trim().to_string()));
        }

        Ok(Self { identities })
    }

    /// Number of maintainer identities loaded.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether the keyring holds no identity at all.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Keyring for FileKeyring {
    fn check_signature(&self, content: &[u8], signature: &[u8]) -> Result<Maintainer, KeyringError> {
        let text = std::str::from_utf8(signature)
            .map_err(|e| KeyringError::MalformedSignature(e.to_string()))?;
        let bytes = BASE64
            .decode(text.trim())
            .map_err(|e| KeyringError::MalformedSignature(e.to_string()))?;
        let signature = Signature::from_slice(&bytes)
            .map_err(|e| KeyringError::MalformedSignature(e.to_string()))?;

        self.identities
            .iter()
            .find(|(key, _)| key.verify(content, &signature).is_ok())
            .map(|(_, name)| Maintainer { name: name.clone() })
            .ok_or(KeyringError::UnknownSigner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer as _, SigningKey};
    use rand::RngCore;

    fn keypair() -> SigningKey {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        SigningKey::from_bytes(&bytes)
    }

    fn sign_b64(key: &SigningKey, message: &[u8]) -> Vec<u8> {
        BASE64.encode(key.sign(message).to_bytes()).into_bytes()
    }

    #[test]
    fn known_maintainer_verifies() {
        let jane = keypair();
        let body = format!(
            "# porter maintainers\n{} Jane Doe <jane@example.org>\n",
            BASE64.encode(jane.verifying_key().to_bytes())
        );
        let keyring = FileKeyring::parse(&body, "test").unwrap();
        assert_eq!(keyring.len(), 1);

        let message = b"package bytes";
        let maintainer = keyring
            .check_signature(message, &sign_b64(&jane, message))
            .unwrap();
        assert_eq!(maintainer.name, "Jane Doe <jane@example.org>");
    }

    #[test]
    fn first_matching_identity_wins() {
        let jane = keypair();
        let john = keypair();
        let body = format!(
            "{} Jane\n{} John\n",
            BASE64.encode(jane.verifying_key().to_bytes()),
            BASE64.encode(john.verifying_key().to_bytes())
        );
        let keyring = FileKeyring::parse(&body, "test").unwrap();

        let message = b"payload";
        let maintainer = keyring
            .check_signature(message, &sign_b64(&john, message))
            .unwrap();
        assert_eq!(maintainer.name, "John");
    }

    #[test]
    fn unknown_signer_rejected() {
        let jane = keypair();
        let stranger = keypair();
        let body = format!("{} Jane\n", BASE64.encode(jane.verifying_key().to_bytes()));
        let keyring = FileKeyring::parse(&body, "test").unwrap();

        let message = b"payload";
        let err = keyring
            .check_signature(message, &sign_b64(&stranger, message))
            .unwrap_err();
        assert!(matches!(err, KeyringError::UnknownSigner));
    }

    #[test]
    fn corrupted_signature_rejected() {
        let jane = keypair();
        let body = format!("{} Jane\n", BASE64.encode(jane.verifying_key().to_bytes()));
        let keyring = FileKeyring::parse(&body, "test").unwrap();

        let message = b"payload";
        let mut sig = sign_b64(&jane, message);
        // Flip one character of the base64 text.
        sig[0] = if sig[0] == b'A' { b'B' } else { b'A' };

        assert!(keyring.check_signature(message, &sig).is_err());
    }

    #[test]
    fn malformed_keyring_line_rejected() {
        let err = FileKeyring::parse("not-base64-at-all Jane\n", "test").unwrap_err();
        assert!(matches!(err, KeyringError::InvalidEntry { line: 1, .. }));
    }
}
