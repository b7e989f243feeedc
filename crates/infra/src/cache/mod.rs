//! Response caching with moka
//!
//! Holds successful GET responses for a bounded time. Entries are keyed by
//! method, URL without query, and the query pairs sorted, so `?a=1&b=2` and
//! `?b=2&a=1` share an entry. Sorted pairs are re-encoded, so a value
//! containing `&` or `=` never collides with a split query.
//!
//! Only 2xx responses are stored; errors are never cached.

use std::time::Duration;

use groupvan_domain::{CacheConfig, HttpMethod};
use moka::future::Cache;
use url::form_urlencoded;
use url::Url;

use crate::api::request::ApiResponse;

/// Cache key for a request: `METHOD scheme://host/path?sorted-query`
pub fn cache_key(method: HttpMethod, url: &Url) -> String {
    let mut pairs: Vec<(String, String)> =
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    pairs.sort();

    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);

    if pairs.is_empty() {
        return format!("{method} {base}");
    }
    let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(&pairs).finish();
    format!("{method} {base}?{query}")
}

/// TTL and capacity bounded store of raw responses
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, ApiResponse>,
    ttl: Duration,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let inner = Cache::builder().time_to_live(ttl).max_capacity(max_capacity).build();
        Self { inner, ttl }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        tracing::info!(
            ttl_seconds = config.ttl_secs,
            max_capacity = config.max_entries,
            "response cache configuration loaded"
        );
        Self::new(config.ttl(), config.max_entries)
    }

    pub async fn get(&self, key: &str) -> Option<ApiResponse> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, response: ApiResponse) {
        self.inner.insert(key, response).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
