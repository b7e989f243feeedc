//! Cache stage: serves opted-in GETs from [`ResponseCache`]

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;
use groupvan_domain::{CacheProvenance, HttpMethod};
use tracing::debug;

use crate::api::pipeline::{Interceptor, Next};
use crate::api::request::{ApiRequest, ApiResponse};
use crate::cache::{cache_key, ResponseCache};

#[derive(Debug, Clone, Default)]
pub struct CacheInterceptor {
    cache: Option<ResponseCache>,
}

impl CacheInterceptor {
    /// `None` turns the stage into a pass-through
    pub fn new(cache: Option<ResponseCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Interceptor for CacheInterceptor {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> GroupVanResult<ApiResponse> {
        let cache = match &self.cache {
            Some(cache) if request.use_cache && request.method == HttpMethod::Get => cache,
            _ => return next.run(request).await,
        };

        let key = cache_key(request.method, &request.url);
        if let Some(mut hit) = cache.get(&key).await {
            debug!(cache_key = %key, "response cache hit");
            hit.provenance = CacheProvenance::Cache;
            hit.attempts = 0;
            hit.request.correlation_id = request.correlation_id;
            return Ok(hit);
        }

        let response = next.run(request).await?;
        if response.is_success() {
            cache.insert(key, response.clone()).await;
        }
        Ok(response)
    }
}
