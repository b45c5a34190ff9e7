//! Two-tier response cache for OpenAlex payloads
//!
//! Lookups go to the in-process session tier first, then to the durable
//! tier (Redis). Durable hits are copied into the session tier. Writes land
//! in the session tier immediately while the durable write runs in a
//! detached task; its failures are only logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citeforge_common::cache::Cache;
use citeforge_common::errors::Result;
use citeforge_common::metrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// One cached API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub inserted_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, payload: Value) -> Self {
        Self {
            key: key.into(),
            payload,
            inserted_at: Utc::now(),
        }
    }

    /// Whether the entry has outlived `ttl` at `now`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.inserted_at + ttl <= now,
            Err(_) => false,
        }
    }
}

/// Key-value store surviving across runs
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[async_trait]
impl DurableStore for Cache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_raw(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.set_raw(key, &value, ttl.as_secs().max(1)).await
    }
}

/// Session + durable response cache
pub struct ResponseCache {
    session: RwLock<HashMap<String, CacheEntry>>,
    durable: Option<Arc<dyn DurableStore>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Session-only cache
    pub fn in_memory() -> Self {
        Self {
            session: RwLock::new(HashMap::new()),
            durable: None,
            ttl: Duration::ZERO,
        }
    }

    /// Cache backed by a durable store with the given entry lifetime
    pub fn with_durable(durable: Arc<dyn DurableStore>, ttl: Duration) -> Self {
        Self {
            session: RwLock::new(HashMap::new()),
            durable: Some(durable),
            ttl,
        }
    }

    pub fn has_durable_tier(&self) -> bool {
        self.durable.is_some()
    }

    /// Number of entries in the session tier
    pub async fn session_len(&self) -> usize {
        self.session.read().await.len()
    }

    /// Look up a payload, session tier first
    pub async fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.session.read().await.get(key) {
            metrics::record_cache(true, "session");
            debug!(key, tier = "session", "Cache hit");
            return Some(entry.payload.clone());
        }
        metrics::record_cache(false, "session");

        let durable = self.durable.as_ref()?;
        let raw = match durable.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                metrics::record_cache(false, "durable");
                return None;
            }
            Err(e) => {
                warn!(key, code = e.code().as_code(), error = %e, "Durable cache read failed, treating as miss");
                metrics::record_cache(false, "durable");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Undecodable durable cache entry, treating as miss");
                metrics::record_cache(false, "durable");
                return None;
            }
        };

        if entry.is_expired(self.ttl, Utc::now()) {
            debug!(key, inserted_at = %entry.inserted_at, "Durable cache entry expired");
            metrics::record_cache(false, "durable");
            return None;
        }

        metrics::record_cache(true, "durable");
        debug!(key, tier = "durable", "Cache hit");
        let payload = entry.payload.clone();
        self.session.write().await.insert(key.to_string(), entry);
        Some(payload)
    }

    /// Store a payload; never fails from the caller's point of view
    pub async fn put(&self, key: &str, payload: Value) {
        let entry = CacheEntry::new(key, payload);

        if let Some(durable) = &self.durable {
            match serde_json::to_string(&entry) {
                Ok(raw) => {
                    let durable = durable.clone();
                    let key = key.to_string();
                    let ttl = self.ttl;
                    tokio::spawn(async move {
                        if let Err(e) = durable.set(&key, raw, ttl).await {
                            warn!(key = %key, code = e.code().as_code(), error = %e, "Durable cache write failed");
                        }
                    });
                }
                Err(e) => warn!(key, error = %e, "Failed to serialize cache entry"),
            }
        }

        self.session.write().await.insert(key.to_string(), entry);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use citeforge_common::errors::AppError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Durable store kept in memory, optionally failing every call
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub entries: Mutex<HashMap<String, String>>,
        pub failing: bool,
    }

    impl MemoryStore {
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl DurableStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            if self.failing {
                return Err(AppError::CacheError { message: "down".into() });
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: String, _ttl: Duration) -> Result<()> {
            if self.failing {
                return Err(AppError::CacheError { message: "down".into() });
            }
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    /// Let detached durable writes run
    pub(crate) async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    const WEEK: Duration = Duration::from_secs(60 * 60 * 24 * 7);

    #[tokio::test]
    async fn test_session_tier_round_trip() {
        let cache = ResponseCache::in_memory();
        assert_eq!(cache.get("k").await, None);

        cache.put("k", json!({"results": []})).await;
        assert_eq!(cache.get("k").await, Some(json!({"results": []})));
        assert_eq!(cache.session_len().await, 1);
    }

    #[tokio::test]
    async fn test_durable_write_and_cross_run_read() {
        let store = Arc::new(MemoryStore::default());

        let first_run = ResponseCache::with_durable(store.clone(), WEEK);
        first_run.put("page", json!({"meta": {"count": 1}})).await;
        settle().await;
        assert!(store.entries.lock().unwrap().contains_key("page"));

        // A fresh process starts with an empty session tier
        let second_run = ResponseCache::with_durable(store.clone(), WEEK);
        assert_eq!(second_run.session_len().await, 0);
        assert_eq!(second_run.get("page").await, Some(json!({"meta": {"count": 1}})));
        // Durable hits are copied into the session tier
        assert_eq!(second_run.session_len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_durable_entries_are_absent() {
        let store = Arc::new(MemoryStore::default());
        let mut entry = CacheEntry::new("old", json!(1));
        entry.inserted_at = Utc::now() - chrono::Duration::days(8);
        store
            .entries
            .lock()
            .unwrap()
            .insert("old".into(), serde_json::to_string(&entry).unwrap());

        let cache = ResponseCache::with_durable(store, WEEK);
        assert_eq!(cache.get("old").await, None);
    }

    #[tokio::test]
    async fn test_durable_failures_are_swallowed() {
        let cache = ResponseCache::with_durable(Arc::new(MemoryStore::failing()), WEEK);
        assert_eq!(cache.get("k").await, None);

        cache.put("k", json!("v")).await;
        settle().await;
        // Session tier still serves the value
        assert_eq!(cache.get("k").await, Some(json!("v")));
    }

    #[tokio::test]
    async fn test_corrupt_durable_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::default());
        store.entries.lock().unwrap().insert("k".into(), "not json".into());

        let cache = ResponseCache::with_durable(store, WEEK);
        assert_eq!(cache.get("k").await, None);
    }

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new("k", json!(null));
        let now = entry.inserted_at;
        assert!(!entry.is_expired(WEEK, now + chrono::Duration::days(6)));
        assert!(entry.is_expired(WEEK, now + chrono::Duration::days(7)));
    }
}
