//! CiteForge Common Library
//!
//! Shared code for the CiteForge crates including:
//! - Error types and handling
//! - Configuration management
//! - Redis durable cache client
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling on results OpenAlex serves for a single filtered listing
pub const OPENALEX_MAX_RESULTS: usize = 10_000;

/// User agent sent with outbound requests
pub const USER_AGENT: &str = concat!("citeforge/", env!("CARGO_PKG_VERSION"));
