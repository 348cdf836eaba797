//! `porter-archiver` binary: load keys, open storage, serve uploads.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use porter_archiver::keyring::FileKeyring;
use porter_archiver::signer::Ed25519Signer;
use porter_archiver::storage::FtpStorage;
use porter_archiver::{AppState, Archiver, app};

#[derive(Parser)]
#[command(name = "porter-archiver")]
#[command(about = "porter package archive server", long_about = None)]
struct Cli {
    /// Path to the archive's base64 ed25519 signing key
    #[arg(long)]
    signing_key: PathBuf,

    /// Path to the maintainer public keyring
    #[arg(long)]
    maintainer_keyring: PathBuf,

    /// FTP host of the storage backend (host:port)
    #[arg(long)]
    ftp_host: String,

    /// FTP user
    #[arg(long)]
    ftp_user: String,

    /// FTP password
    #[arg(long)]
    ftp_pass: String,

    /// Base directory on the FTP backend
    #[arg(long, default_value = "")]
    ftp_dir: String,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0:8888")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let signer =
        Ed25519Signer::from_key_file(&cli.signing_key).context("loading archive signing key")?;
    let keyring =
        FileKeyring::from_file(&cli.maintainer_keyring).context("loading maintainer keyring")?;
    tracing::debug!(maintainers = keyring.len(), "loaded maintainer keyring");

    let storage = FtpStorage::new(&cli.ftp_host, &cli.ftp_user, &cli.ftp_pass, &cli.ftp_dir)
        .context("opening storage backend")?;

    let archiver = Archiver::new(Arc::new(keyring), Arc::new(signer), Arc::new(storage))
        .await
        .context("loading archive index")?;

    let state = AppState {
        archiver: Arc::new(archiver),
    };

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    tracing::info!(address = %cli.listen, "listening for packages");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
