//! `porter list`: enumerate installed or available packages.

use anyhow::Result;

use porter_core::cache::LocalCache;
use porter_core::client::HttpArchiveClient;
use porter_core::config::Config;

pub async fn run(installed: bool) -> Result<()> {
    let config = Config::load()?;
    let cache = LocalCache::open(&config.cache_path)?;
    let client = HttpArchiveClient::new(&config.archive_addr)?;

    let packages = cache.list(installed, &client).await?;
    if packages.is_empty() && installed {
        tracing::info!("no packages installed");
        return Ok(());
    }

    for package in packages {
        println!("{package}");
    }
    Ok(())
}
