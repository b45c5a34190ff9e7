//! # CiteForge Network
//!
//! Citation/reference network construction over the OpenAlex API:
//! - Rate-limited, retried, paginated fetching
//! - Two-tier (session + Redis) response caching
//! - Identifier resolution
//! - Level-synchronous breadth-first network building
//! - Open-access full-text download

pub mod cache;
pub mod citation;
pub mod errors;
pub mod fulltext;
pub mod limiter;
pub mod models;
pub mod openalex;
pub mod resolver;
pub mod retry;

pub use cache::{DurableStore, ResponseCache};
pub use citation::{BuildParams, CitationNetwork, Edge, NetworkBuilder, NetworkDocument};
pub use errors::{BuildError, FetchError, FullTextError, ResolveError};
pub use limiter::RateLimiter;
pub use models::{Relation, WorkId, WorkRecord};
pub use openalex::{HttpTransport, PaginatedFetcher, WorkFetcher, WorkLookup};
pub use retry::RetryPolicy;
