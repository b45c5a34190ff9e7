//! Paginated neighbor lookups with caching, rate limiting and retries

use super::{Neighbors, OpenAlexTransport, PageEnvelope, WorkFetcher, WorkLookup};
use crate::cache::ResponseCache;
use crate::errors::FetchError;
use crate::limiter::RateLimiter;
use crate::models::{Relation, WorkId, WorkRecord};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use citeforge_common::cache::keys;
use citeforge_common::config::OpenAlexConfig;
use citeforge_common::{metrics, OPENALEX_MAX_RESULTS};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default page size for filtered listings
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// OpenAlex client used by the network builder
pub struct PaginatedFetcher {
    transport: Arc<dyn OpenAlexTransport>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    page_size: usize,
    max_results: usize,
}

impl PaginatedFetcher {
    pub fn new(
        transport: Arc<dyn OpenAlexTransport>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            cache,
            limiter,
            retry,
            page_size: DEFAULT_PAGE_SIZE,
            max_results: OPENALEX_MAX_RESULTS,
        }
    }

    /// Apply page size and result ceiling from configuration
    pub fn configured(mut self, config: &OpenAlexConfig) -> Self {
        self.page_size = config.page_size.max(1);
        self.max_results = config.max_results.min(OPENALEX_MAX_RESULTS);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Metadata for a single work
    #[instrument(skip(self), fields(work_id = %id))]
    pub async fn get_work(&self, id: &WorkId) -> Result<WorkRecord, FetchError> {
        let path = format!("works/{}", id);
        self.cached_get(&keys::work(id.as_str()), &path, &[], |body| {
            WorkRecord::deserialize(body).map_err(|e| e.to_string())
        })
        .await
    }

    /// One page of a filtered listing
    async fn fetch_page(
        &self,
        id: &WorkId,
        relation: Relation,
        page: usize,
        per_page: usize,
    ) -> Result<PageEnvelope, FetchError> {
        let filter = relation.filter();
        let key = keys::works_page(filter, id.as_str(), page, per_page);
        let query = vec![
            ("filter".to_string(), format!("{}:{}", filter, id)),
            ("page".to_string(), page.to_string()),
            ("per-page".to_string(), per_page.to_string()),
        ];

        self.cached_get(&key, "works", &query, |body| {
            PageEnvelope::deserialize(body).map_err(|e| e.to_string())
        })
        .await
    }

    /// Cache lookup, then rate-limited retried request
    ///
    /// `decode` validates the body; a body it rejects is retried and never
    /// cached. A cached body it rejects is ignored and refetched.
    async fn cached_get<T, D>(
        &self,
        key: &str,
        path: &str,
        query: &[(String, String)],
        decode: D,
    ) -> Result<T, FetchError>
    where
        D: Fn(&Value) -> Result<T, String>,
    {
        if let Some(body) = self.cache.get(key).await {
            match decode(&body) {
                Ok(value) => return Ok(value),
                Err(message) => warn!(key, error = %message, "Ignoring undecodable cached response"),
            }
        }

        let endpoint = path.split('/').next().unwrap_or(path);
        let (body, value) = self
            .retry
            .run(endpoint, || async {
                self.limiter.acquire().await;
                let body = self.transport.get_json(path, query).await?;
                match decode(&body) {
                    Ok(value) => Ok((body, value)),
                    Err(message) => Err(FetchError::MalformedResponse {
                        url: path.to_string(),
                        message,
                    }),
                }
            })
            .await?;

        self.cache.put(key, body).await;
        Ok(value)
    }
}

#[async_trait]
impl WorkFetcher for PaginatedFetcher {
    #[instrument(skip(self), fields(work_id = %id, relation = %relation))]
    async fn fetch(&self, id: &WorkId, relation: Relation, limit: usize) -> Result<Neighbors, FetchError> {
        let limit = limit.min(self.max_results);
        let mut neighbors = Neighbors::default();
        if limit == 0 {
            return Ok(neighbors);
        }

        let per_page = self.page_size.min(limit);
        let mut seen = 0usize;
        let mut skipped = 0usize;
        let mut page = 1;

        loop {
            let envelope = self.fetch_page(id, relation, page, per_page).await?;
            let returned = envelope.results.len();
            if returned == 0 {
                break;
            }
            seen += returned;

            for entry in envelope.results {
                if neighbors.len() >= limit {
                    break;
                }
                match WorkRecord::deserialize(&entry) {
                    Ok(record) => match record.work_id() {
                        Some(work_id) => {
                            neighbors.push(work_id, record);
                        }
                        None => {
                            warn!(raw_id = %record.id, "Skipping entry with unrecognized id");
                            skipped += 1;
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, page, "Skipping undecodable entry");
                        skipped += 1;
                    }
                }
            }

            let exhausted = envelope.meta.count.is_some_and(|total| seen as u64 >= total);
            if neighbors.len() >= limit
                || exhausted
                || returned < per_page
                || page * per_page >= self.max_results
            {
                break;
            }
            page += 1;
        }

        if skipped > 0 {
            metrics::record_skipped_entries(skipped);
        }
        debug!(count = neighbors.len(), pages = page, skipped, "Fetched neighbors");
        Ok(neighbors)
    }
}

#[async_trait]
impl WorkLookup for PaginatedFetcher {
    async fn work(&self, id: &WorkId) -> Result<WorkRecord, FetchError> {
        self.get_work(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{settle, MemoryStore};
    use crate::openalex::testing::{work_json, StubTransport};
    use serde_json::json;
    use std::time::Duration;

    fn wid(raw: &str) -> WorkId {
        raw.parse().unwrap()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn fetcher_with(transport: Arc<StubTransport>, cache: Arc<ResponseCache>) -> PaginatedFetcher {
        let limiter = Arc::new(RateLimiter::new(1_000, Duration::from_secs(1)).unwrap());
        PaginatedFetcher::new(transport, cache, limiter, fast_retry())
    }

    fn fetcher(transport: Arc<StubTransport>) -> PaginatedFetcher {
        fetcher_with(transport, Arc::new(ResponseCache::in_memory()))
    }

    fn citers(n: usize) -> Vec<Value> {
        (1..=n).map(|i| work_json(&format!("W{}", 100 + i))).collect()
    }

    #[tokio::test]
    async fn test_aggregates_pages_up_to_limit() {
        let stub = Arc::new(StubTransport::default().with_listing("cites:W1", citers(7)));
        let fetcher = fetcher(stub.clone()).with_page_size(2);

        let result = fetcher.fetch(&wid("W1"), Relation::Citations, 5).await.unwrap();

        let ids: Vec<&str> = result.ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["W101", "W102", "W103", "W104", "W105"]);
        assert_eq!(result.records.len(), 5);
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_stops_when_reported_count_is_reached() {
        let stub = Arc::new(StubTransport::default().with_listing("cited_by:W1", citers(4)));
        let fetcher = fetcher(stub.clone()).with_page_size(2);

        let result = fetcher.fetch(&wid("W1"), Relation::References, 100).await.unwrap();

        assert_eq!(result.len(), 4);
        // Two full pages, no request for a third
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_page_size_never_exceeds_limit() {
        let stub = Arc::new(StubTransport::default().with_listing("cites:W1", citers(50)));
        let fetcher = fetcher(stub.clone());

        let result = fetcher.fetch(&wid("W1"), Relation::Citations, 3).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(stub.calls(), 1);
        assert!(fetcher
            .cache()
            .get(&keys::works_page("cites", "W1", 1, 3))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_zero_limit_makes_no_request() {
        let stub = Arc::new(StubTransport::default().with_listing("cites:W1", citers(3)));
        let fetcher = fetcher(stub.clone());

        let result = fetcher.fetch(&wid("W1"), Relation::Citations, 0).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let stub = Arc::new(StubTransport::default());
        let result = fetcher(stub.clone())
            .fetch(&wid("W9"), Relation::Citations, 10)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_bad_entries_are_skipped_and_duplicates_collapsed() {
        let entries = vec![
            work_json("W2"),
            json!({"id": 12, "title": "numeric id"}),
            json!({"id": "https://openalex.org/A5", "display_name": "an author"}),
            json!({"title": "no id at all"}),
            work_json("W2"),
            work_json("W3"),
        ];
        let stub = Arc::new(StubTransport::default().with_listing("cites:W1", entries));

        let result = fetcher(stub)
            .fetch(&wid("W1"), Relation::Citations, 10)
            .await
            .unwrap();

        let ids: Vec<&str> = result.ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["W2", "W3"]);
        assert_eq!(result.records[&wid("W3")].title.as_deref(), Some("Work W3"));
    }

    #[tokio::test]
    async fn test_transient_page_errors_are_retried() {
        let stub = Arc::new(StubTransport::default().with_listing("cites:W1", citers(2)));
        stub.script(
            "cites:W1",
            vec![
                FetchError::Upstream { status: 503, url: "works".into() },
                FetchError::Timeout { url: "works".into() },
            ],
        );

        let result = fetcher(stub.clone())
            .fetch(&wid("W1"), Relation::Citations, 10)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_page_error_fails_the_call() {
        let stub = Arc::new(StubTransport::default().with_listing("cites:W1", citers(2)));
        stub.script("cites:W1", vec![FetchError::BadRequest { status: 400, url: "works".into() }]);

        let err = fetcher(stub.clone())
            .fetch(&wid("W1"), Relation::Citations, 10)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::BadRequest { status: 400, .. }));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_the_call() {
        let stub = Arc::new(StubTransport::default());
        stub.script(
            "cites:W1",
            (0..4).map(|_| FetchError::RateLimited { url: "works".into() }).collect(),
        );

        let err = fetcher(stub.clone())
            .fetch(&wid("W1"), Relation::Citations, 10)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RateLimited { .. }));
        assert_eq!(stub.calls(), 4);
    }

    #[tokio::test]
    async fn test_warm_cache_skips_transport() {
        let cache = Arc::new(ResponseCache::in_memory());
        let stub = Arc::new(StubTransport::default().with_listing("cites:W1", citers(5)));
        let fetcher = fetcher_with(stub.clone(), cache).with_page_size(2);

        let cold = fetcher.fetch(&wid("W1"), Relation::Citations, 10).await.unwrap();
        let calls = stub.calls();
        let warm = fetcher.fetch(&wid("W1"), Relation::Citations, 10).await.unwrap();

        assert_eq!(cold, warm);
        assert_eq!(stub.calls(), calls);
    }

    #[tokio::test]
    async fn test_durable_tier_serves_a_new_process() {
        let store = Arc::new(MemoryStore::default());
        let week = Duration::from_secs(604_800);
        let listing = citers(3);

        let first = Arc::new(StubTransport::default().with_listing("cites:W1", listing));
        let cold = fetcher_with(first, Arc::new(ResponseCache::with_durable(store.clone(), week)))
            .fetch(&wid("W1"), Relation::Citations, 10)
            .await
            .unwrap();
        settle().await;

        // Second run against an API that knows nothing
        let second = Arc::new(StubTransport::default());
        let warm = fetcher_with(second.clone(), Arc::new(ResponseCache::with_durable(store, week)))
            .fetch(&wid("W1"), Relation::Citations, 10)
            .await
            .unwrap();

        assert_eq!(cold, warm);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_work() {
        let stub = Arc::new(StubTransport::default().with_work("W7", work_json("W7")));
        let fetcher = fetcher(stub.clone());

        let record = fetcher.get_work(&wid("W7")).await.unwrap();
        assert_eq!(record.bare_doi(), Some("10.1000/w7"));

        // Second lookup is served from the cache
        fetcher.get_work(&wid("W7")).await.unwrap();
        assert_eq!(stub.calls(), 1);

        let missing = fetcher.get_work(&wid("W8")).await.unwrap_err();
        assert!(matches!(missing, FetchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_retried_and_not_cached() {
        struct Flaky {
            calls: std::sync::atomic::AtomicUsize,
        }

        #[async_trait]
        impl OpenAlexTransport for Flaky {
            async fn get_json(&self, _path: &str, _query: &[(String, String)]) -> Result<Value, FetchError> {
                let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    Ok(json!({"error": "unexpected"}))
                } else {
                    Ok(json!({"meta": {"count": 1}, "results": [work_json("W5")]}))
                }
            }
        }

        let transport = Arc::new(Flaky { calls: Default::default() });
        let limiter = Arc::new(RateLimiter::new(1_000, Duration::from_secs(1)).unwrap());
        let cache = Arc::new(ResponseCache::in_memory());
        let fetcher = PaginatedFetcher::new(transport.clone(), cache.clone(), limiter, fast_retry());

        let result = fetcher.fetch(&wid("W1"), Relation::Citations, 10).await.unwrap();

        assert_eq!(result.ids, vec![wid("W5")]);
        assert_eq!(transport.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(cache.session_len().await, 1);
    }
}
