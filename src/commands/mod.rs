//! CLI command implementations

pub mod cache;
pub mod ping;
pub mod status;

// Re-export command functions for convenience
pub use cache::{cache_clear, cache_show};
pub use ping::ping;
pub use status::status;

use std::sync::Arc;

use crate::config::Config;
use crate::endpoint::EndpointCatalog;
use crate::resolve::{FileStore, ResolutionCache, SystemClock};

/// Build the standard catalog from configuration
pub(crate) fn build_catalog(config: &Config) -> anyhow::Result<EndpointCatalog> {
    Ok(EndpointCatalog::new(
        &config.connectivity.primary_base,
        &config.connectivity.fallback_base,
    )?)
}

/// Build the persistent resolution cache from configuration
pub(crate) fn build_cache(config: &Config) -> Arc<ResolutionCache> {
    Arc::new(
        ResolutionCache::new(
            Box::new(FileStore::new(&config.cache.snapshot_path)),
            Box::new(SystemClock),
        )
        .with_default_ttl(config.cache.ttl_ms),
    )
}
