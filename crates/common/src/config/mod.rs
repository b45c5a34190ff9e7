//! Configuration management for CiteForge
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<APP_ENV>, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// OpenAlex API configuration
    #[serde(default)]
    pub openalex: OpenAlexConfig,

    /// Outbound rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy for transient API failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Default crawl parameters
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Full-text retrieval
    #[serde(default)]
    pub fulltext: FullTextConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAlexConfig {
    /// API base URL
    #[serde(default = "default_openalex_base_url")]
    pub base_url: String,

    /// Contact email sent with every request (polite pool)
    pub mailto: Option<String>,

    /// Results requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hard ceiling on results aggregated by a single fetch
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Redis URL for the durable tier; session-only caching when unset
    pub redis_url: Option<String>,

    /// Durable entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Number of hops expanded from the root
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Citations and references fetched per node, per relation
    #[serde(default = "default_per_node_limit")]
    pub per_node_limit: usize,

    /// Node groups fetched concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Optional cap on the total number of nodes
    pub max_nodes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FullTextConfig {
    /// Unpaywall API base URL
    #[serde(default = "default_unpaywall_base_url")]
    pub unpaywall_base_url: String,

    /// Directory for downloaded PDFs and crawl output
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full env-filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_openalex_base_url() -> String { "https://api.openalex.org".to_string() }
fn default_page_size() -> usize { 200 }
fn default_max_results() -> usize { 10_000 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_requests() -> u32 { 10 }
fn default_window_ms() -> u64 { 2_000 }
fn default_max_attempts() -> u32 { 4 }
fn default_base_delay() -> u64 { 1_000 }
fn default_max_delay() -> u64 { 10_000 }
fn default_cache_ttl() -> u64 { 60 * 60 * 24 * 7 }
fn default_key_prefix() -> String { "openalex".to_string() }
fn default_max_depth() -> usize { 1 }
fn default_per_node_limit() -> usize { 100 }
fn default_max_concurrency() -> usize { 10 }
fn default_unpaywall_base_url() -> String { "https://api.unpaywall.org".to_string() }
fn default_data_dir() -> String { "data".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: default_openalex_base_url(),
            mailto: None,
            page_size: default_page_size(),
            max_results: default_max_results(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_cache_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            per_node_limit: default_per_node_limit(),
            max_concurrency: default_max_concurrency(),
            max_nodes: None,
        }
    }
}

impl Default for FullTextConfig {
    fn default() -> Self {
        Self {
            unpaywall_base_url: default_unpaywall_base_url(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__CRAWL__MAX_DEPTH=2
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get OpenAlex request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.openalex.timeout_secs)
    }

    /// Get the rate limit window as Duration
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit.window_ms)
    }

    /// Get the durable cache TTL as Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openalex: OpenAlexConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheSettings::default(),
            crawl: CrawlConfig::default(),
            fulltext: FullTextConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
