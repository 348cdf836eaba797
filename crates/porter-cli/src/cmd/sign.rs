//! `porter sign`: produce the detached maintainer signature for a package.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signer as _, SigningKey};

use porter_core::config::Config;

pub fn run(package: &Path) -> Result<()> {
    let config = Config::load()?;
    if config.maintainer.signing_key.is_empty() {
        bail!("no signing key configured; set maintainer.signing_key or PORTER_SIGNING_KEY");
    }

    let key = load_key(Path::new(&config.maintainer.signing_key))?;

    tracing::debug!(package = %package.display(), "signing package");
    let data = fs::read(package).context("failed to read package")?;
    let signature = BASE64.encode(key.sign(&data).to_bytes());

    let asc_path = std::path::PathBuf::from(format!("{}.asc", package.display()));
    fs::write(&asc_path, signature).context("failed to write signature file")?;

    tracing::info!(
        package = %package.display(),
        signature = %asc_path.display(),
        "successfully signed package"
    );
    Ok(())
}

fn load_key(path: &Path) -> Result<SigningKey> {
    let encoded = fs::read_to_string(path).context("failed to read signing key")?;
    let bytes = BASE64
        .decode(encoded.trim())
        .context("signing key is not valid base64")?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("signing key must be a 32-byte ed25519 private key"))?;
    Ok(SigningKey::from_bytes(&arr))
}
