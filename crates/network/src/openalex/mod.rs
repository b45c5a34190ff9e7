//! OpenAlex API access
//!
//! `transport` performs raw JSON requests, `fetcher` layers cache, rate
//! limiting, retries and pagination on top and exposes the neighbor lookup
//! the network builder depends on.

mod fetcher;
mod transport;

pub use fetcher::PaginatedFetcher;
pub use transport::{HttpTransport, OpenAlexTransport};

use crate::errors::FetchError;
use crate::models::{Relation, WorkId, WorkRecord};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Neighbors of one work for one relation, in API order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbors {
    pub ids: Vec<WorkId>,
    pub records: HashMap<WorkId, WorkRecord>,
}

impl Neighbors {
    /// Append a neighbor; later duplicates of an id are ignored
    pub fn push(&mut self, id: WorkId, record: WorkRecord) -> bool {
        if self.records.contains_key(&id) {
            return false;
        }
        self.ids.push(id.clone());
        self.records.insert(id, record);
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Source of citation/reference neighbors
#[async_trait]
pub trait WorkFetcher: Send + Sync {
    /// Up to `limit` works related to `id` by `relation`
    async fn fetch(&self, id: &WorkId, relation: Relation, limit: usize) -> Result<Neighbors, FetchError>;
}

/// Single-work metadata lookup
#[async_trait]
pub trait WorkLookup: Send + Sync {
    async fn work(&self, id: &WorkId) -> Result<WorkRecord, FetchError>;
}

/// Envelope of a filtered `/works` listing
#[derive(Debug, Deserialize)]
pub(crate) struct PageEnvelope {
    pub results: Vec<Value>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageMeta {
    pub count: Option<u64>,
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory OpenAlex stand-in

    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves `/works` listings from a fixed citation graph
    #[derive(Default)]
    pub(crate) struct StubTransport {
        /// `"cites:W1"` / `"cited_by:W1"` -> raw result entries
        listings: HashMap<String, Vec<Value>>,
        works: HashMap<String, Value>,
        /// Errors returned (in order) before a key starts succeeding
        scripted: Mutex<HashMap<String, VecDeque<FetchError>>>,
        pub calls: AtomicUsize,
    }

    pub(crate) fn work_json(id: &str) -> Value {
        json!({
            "id": format!("https://openalex.org/{}", id),
            "title": format!("Work {}", id),
            "doi": format!("https://doi.org/10.1000/{}", id.to_lowercase()),
        })
    }

    impl StubTransport {
        /// Graph given as `(citing, cited)` pairs
        pub fn from_citations(pairs: &[(&str, &str)]) -> Self {
            let mut stub = Self::default();
            for (citing, cited) in pairs {
                stub.listings
                    .entry(format!("cites:{}", cited))
                    .or_default()
                    .push(work_json(citing));
                stub.listings
                    .entry(format!("cited_by:{}", citing))
                    .or_default()
                    .push(work_json(cited));
                stub.works.insert(citing.to_string(), work_json(citing));
                stub.works.insert(cited.to_string(), work_json(cited));
            }
            stub
        }

        /// Raw entries for one filter, bypassing the graph helper
        pub fn with_listing(mut self, filter: &str, entries: Vec<Value>) -> Self {
            self.listings.insert(filter.to_string(), entries);
            self
        }

        pub fn with_work(mut self, id: &str, body: Value) -> Self {
            self.works.insert(id.to_string(), body);
            self
        }

        /// Fail the next requests for `key` (a filter or a `works/<id>` path)
        pub fn script(&self, key: &str, errors: Vec<FetchError>) {
            self.scripted
                .lock()
                .unwrap()
                .insert(key.to_string(), errors.into());
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn scripted_error(&self, key: &str) -> Option<FetchError> {
            self.scripted.lock().unwrap().get_mut(key)?.pop_front()
        }
    }

    fn param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
        query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[async_trait]
    impl OpenAlexTransport for StubTransport {
        async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(id) = path.strip_prefix("works/") {
                if let Some(err) = self.scripted_error(path) {
                    return Err(err);
                }
                return self.works.get(id).cloned().ok_or_else(|| FetchError::NotFound {
                    url: path.to_string(),
                });
            }

            let filter = param(query, "filter").unwrap_or_default();
            if let Some(err) = self.scripted_error(filter) {
                return Err(err);
            }
            let page: usize = param(query, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
            let per_page: usize = param(query, "per-page")
                .and_then(|p| p.parse().ok())
                .unwrap_or(25);

            let all = self.listings.get(filter).cloned().unwrap_or_default();
            let results: Vec<Value> = all
                .iter()
                .skip((page - 1) * per_page)
                .take(per_page)
                .cloned()
                .collect();

            Ok(json!({
                "meta": {"count": all.len(), "page": page, "per_page": per_page},
                "results": results,
            }))
        }
    }
}
