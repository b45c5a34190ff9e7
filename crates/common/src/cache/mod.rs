//! Redis cache integration
//!
//! Provides:
//! - Multiplexed connection management
//! - Raw get/set operations with TTL
//! - Cache key builders for OpenAlex requests

use crate::errors::{AppError, Result};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::debug;

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "openalex".to_string(),
        }
    }
}

/// Redis cache client
pub struct Cache {
    connection: MultiplexedConnection,
    config: CacheConfig,
}

impl Cache {
    /// Create a new cache client
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to create Redis client: {}", e),
            })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self { connection, config })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    /// Get a raw string value from cache
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(&full_key).await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to get key '{}': {}", full_key, e),
            })?;

        debug!(key = %full_key, hit = value.is_some(), "Redis lookup");
        Ok(value)
    }

    /// Set a raw string value with custom TTL
    pub async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        conn.set_ex::<_, _, ()>(&full_key, value, ttl_secs)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })?;

        debug!(key = %full_key, ttl_secs, "Redis set");
        Ok(())
    }
}

/// Cache key builders for OpenAlex requests
pub mod keys {
    /// Key for one page of a filtered works listing
    pub fn works_page(filter: &str, entity_id: &str, page: usize, per_page: usize) -> String {
        format!("works:{}:{}:page:{}:per:{}", filter, entity_id, page, per_page)
    }

    /// Key for a single work lookup
    pub fn work(entity_id: &str) -> String {
        format!("work:{}", entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_builders() {
        assert_eq!(
            keys::works_page("cites", "W1", 2, 200),
            "works:cites:W1:page:2:per:200"
        );
        assert_ne!(
            keys::works_page("cites", "W1", 1, 200),
            keys::works_page("cited_by", "W1", 1, 200)
        );
        assert_eq!(keys::work("W42"), "work:W42");
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.key_prefix, "openalex");
    }
}
