//! `porter keygen`: generate a new ed25519 maintainer key pair.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::SigningKey;
use rand::RngCore;

const KEY_FILE: &str = "porter.key";

pub fn run() -> Result<()> {
    let path = Path::new(KEY_FILE);
    if path.exists() {
        bail!("{KEY_FILE} already exists, refusing to overwrite");
    }

    let mut secret = [0u8; 32];
    rand::rng().fill_bytes(&mut secret);
    let key = SigningKey::from_bytes(&secret);

    let encoded = BASE64.encode(key.to_bytes());
    fs::write(path, &encoded).context("failed to write key file")?;

    println!("private key written to {KEY_FILE}");
    println!("public key (add to the archive keyring):");
    println!("{}", BASE64.encode(key.verifying_key().to_bytes()));

    tracing::info!(key = KEY_FILE, "generated new signing key");
    Ok(())
}
