//! `porter install`: install from a local .pkg file or by alias.

use std::path::Path;

use anyhow::Result;

use porter_core::cache::LocalCache;
use porter_core::client::HttpArchiveClient;
use porter_core::config::Config;

pub async fn run(package: &str) -> Result<()> {
    let config = Config::load()?;
    let mut cache = LocalCache::open(&config.cache_path)?;

    let path = Path::new(package);
    let meta = if path.exists() {
        tracing::info!(package, "installing package from file");
        cache.install_file(path, &config)?
    } else {
        tracing::info!(package, "installing package from archive");
        let client = HttpArchiveClient::new(&config.archive_addr)?;
        cache.install_alias(package, &client, &config).await?
    };

    tracing::info!(package = %meta.alias, "successfully installed package");
    Ok(())
}
