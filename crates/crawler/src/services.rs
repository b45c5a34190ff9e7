//! Explicit construction of the crawler's collaborators

use anyhow::Result;
use citeforge_common::cache::{Cache, CacheConfig};
use citeforge_common::config::AppConfig;
use citeforge_network::fulltext::{Downloader, UnpaywallClient};
use citeforge_network::{
    HttpTransport, NetworkBuilder, PaginatedFetcher, RateLimiter, ResponseCache, RetryPolicy,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a command needs, wired once per process
pub struct Services {
    pub fetcher: Arc<PaginatedFetcher>,
    pub builder: NetworkBuilder,
    pub fulltext: Arc<UnpaywallClient>,
    pub data_dir: PathBuf,
}

impl Services {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::from_config(&config.openalex)?);
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_window(),
        )?);
        info!(
            max_requests = limiter.max_requests(),
            window_ms = config.rate_limit.window_ms,
            "Rate limiter ready"
        );

        let cache = Arc::new(response_cache(config).await);
        info!(
            durable = cache.has_durable_tier(),
            ttl_secs = config.cache.ttl_secs,
            "Response cache ready"
        );
        let fetcher = Arc::new(
            PaginatedFetcher::new(transport, cache, limiter, RetryPolicy::from(&config.retry))
                .configured(&config.openalex),
        );

        let fulltext = Arc::new(UnpaywallClient::with_timeout(
            config.fulltext.unpaywall_base_url.clone(),
            config.openalex.mailto.clone(),
            config.request_timeout(),
        )?);

        Ok(Self {
            builder: NetworkBuilder::new(fetcher.clone()),
            fetcher,
            fulltext,
            data_dir: PathBuf::from(&config.fulltext.data_dir),
        })
    }

    pub fn downloader(&self) -> Downloader {
        Downloader::new(self.fetcher.clone(), self.fulltext.clone(), self.data_dir.clone())
    }
}

/// Session cache, backed by Redis when it is configured and reachable
async fn response_cache(config: &AppConfig) -> ResponseCache {
    let Some(url) = config.cache.redis_url.clone() else {
        warn!("Redis URL not set, durable caching disabled");
        return ResponseCache::in_memory();
    };

    info!("Connecting to Redis at {}", url);
    let cache_config = CacheConfig {
        url,
        key_prefix: config.cache.key_prefix.clone(),
    };

    match Cache::new(cache_config).await {
        Ok(cache) => {
            info!("Redis cache connected");
            ResponseCache::with_durable(Arc::new(cache), config.cache_ttl())
        }
        Err(e) => {
            warn!("Failed to connect to Redis, durable caching disabled: {}", e);
            ResponseCache::in_memory()
        }
    }
}
