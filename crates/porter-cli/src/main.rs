//! `porter` - the client command line.
//!
//! Installs, removes and lists packages against the local cache, signs and
//! uploads release containers to the archive.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "porter")]
#[command(about = "Minimal package manager client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package from a .pkg file or by alias from the archive
    Install {
        /// Path to a .pkg file, or a package alias
        package: String,
    },
    /// Remove an installed package
    Remove {
        /// Alias of the package to remove
        alias: String,
    },
    /// List packages
    List {
        /// Only list locally installed packages
        #[arg(long)]
        installed: bool,
    },
    /// Sign a package with the configured maintainer key
    Sign {
        /// Path to the .pkg file to sign
        package: PathBuf,
    },
    /// Upload a signed package to the archive
    Upload {
        /// Path to the .pkg file (its .asc must sit alongside)
        package: PathBuf,
        /// Override the archive upload address
        #[arg(long)]
        archive: Option<String>,
    },
    /// Generate a new ed25519 maintainer keypair
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Install { package } => cmd::install::run(&package).await,
        Commands::Remove { alias } => cmd::remove::run(&alias),
        Commands::List { installed } => cmd::list::run(installed).await,
        Commands::Sign { package } => cmd::sign::run(&package),
        Commands::Upload { package, archive } => cmd::upload::run(&package, archive.as_deref()).await,
        Commands::Keygen => cmd::keygen::run(),
    }
}
