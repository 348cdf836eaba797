//! `porter remove`: delete an installed package's files and cache entry.

use anyhow::Result;

use porter_core::cache::LocalCache;
use porter_core::config::Config;

pub fn run(alias: &str) -> Result<()> {
    let config = Config::load()?;
    let mut cache = LocalCache::open(&config.cache_path)?;

    let outcome = cache.remove(alias)?;
    for failure in &outcome.failures {
        tracing::warn!(
            file = %failure.path.display(),
            error = %failure.error,
            "error while removing file"
        );
    }

    tracing::info!(
        package = alias,
        files = outcome.removed.len(),
        "successfully removed package"
    );
    Ok(())
}
