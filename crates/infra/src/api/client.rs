//! API client
//!
//! Entry point for typed calls against the GroupVAN REST API. Every call
//! runs the standard interceptor pipeline and resolves to a decoded
//! [`GroupVanResponse`] or a taxonomy error.

use std::sync::Arc;

use bytes::Bytes;
use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_common::resilience::RetryConfig;
use groupvan_common::validation::ObjectValidator;
use groupvan_core::auth::AccessTokenProvider;
use groupvan_domain::{ClientConfig, GroupVanResponse, HttpMethod, RetrySettings};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::interceptors::standard_pipeline;
use super::pipeline::{Pipeline, Transport};
use super::request::{ApiRequest, ApiResponse, RequestOptions};
use crate::cache::ResponseCache;
use crate::errors::InfraError;
use crate::http::HttpTransport;

/// Translate configured retry settings into the policy configuration
pub fn retry_config(settings: &RetrySettings) -> GroupVanResult<RetryConfig> {
    RetryConfig::builder()
        .max_retries(settings.max_retries)
        .exponential_backoff(settings.base_delay(), settings.multiplier, settings.max_delay())
        .honor_retry_after(settings.honor_retry_after)
        .build()
}

/// Decode a JSON body; an empty body decodes as `null`
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> GroupVanResult<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { body };
    serde_json::from_slice(body)
        .map_err(|err| GroupVanError::data(format!("Failed to parse response: {err}")))
}

/// Typed client over the interceptor pipeline
pub struct ApiClient {
    base_url: Url,
    pipeline: Pipeline,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Client wired from configuration: reqwest transport, configured
    /// retries, and a response cache when enabled
    pub fn from_config(
        config: &ClientConfig,
        auth: Option<Arc<dyn AccessTokenProvider>>,
    ) -> GroupVanResult<Self> {
        let mut builder = Self::builder().config(config.clone());
        if let Some(auth) = auth {
            builder = builder.auth(auth);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Absolute URL for an API path, keeping any path prefix of the base URL
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> GroupVanResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))
            .map_err(|err| GroupVanError::from(InfraError::from(err)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Run one logical call and decode the body with `decoder`
    #[instrument(skip(self, options, decoder), fields(method = %method, path = %path))]
    pub async fn request_with<T, D>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
        decoder: D,
    ) -> GroupVanResult<GroupVanResponse<T>>
    where
        D: FnOnce(&[u8]) -> GroupVanResult<T>,
    {
        let cancel = options.cancel.clone();
        let request = self.build_request(method, path, options)?;

        let response = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!("request cancelled by caller");
                        return Err(GroupVanError::Cancelled);
                    }
                    result = self.pipeline.execute(request) => result?,
                }
            }
            None => self.pipeline.execute(request).await?,
        };

        let data = decoder(&response.body)?;
        Ok(into_response(data, response))
    }

    /// Run one logical call and decode the JSON body into `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> GroupVanResult<GroupVanResponse<T>> {
        self.request_with(method, path, options, decode_json::<T>).await
    }

    /// Validate `input` first; on any field error no request is sent
    ///
    /// # Errors
    /// `Validation` carrying every failing field, or any pipeline error.
    pub async fn request_validated<Q, T>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &Q,
        validator: &ObjectValidator<Q>,
        options: RequestOptions,
    ) -> GroupVanResult<GroupVanResponse<T>>
    where
        Q: 'static,
        T: DeserializeOwned,
    {
        validator.validate_and_throw(input)?;
        self.request(method, path, options).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> GroupVanResult<GroupVanResponse<T>> {
        self.request(HttpMethod::Get, path, options).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> GroupVanResult<GroupVanResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Post, path, RequestOptions::new().json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> GroupVanResult<GroupVanResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Put, path, RequestOptions::new().json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> GroupVanResult<GroupVanResponse<T>> {
        self.request(HttpMethod::Delete, path, options).await
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> GroupVanResult<ApiRequest> {
        let url = self.url_for(path, &options.query)?;
        let mut request = ApiRequest::new(method, url);
        request.use_cache = options.use_cache;
        request.authenticated = options.authenticated;
        request.sensitive = options.sensitive;
        if let Some(id) = options.correlation_id {
            request.correlation_id = id;
        }
        for (name, value) in &options.headers {
            request.set_header(name, value)?;
        }
        if let Some(body) = options.body {
            request.body = Some(Bytes::from(serde_json::to_vec(&body)?));
            request.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(request)
    }
}

fn into_response<T>(data: T, response: ApiResponse) -> GroupVanResponse<T> {
    let metadata = response.metadata();
    GroupVanResponse { data, request: response.request, response: metadata }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    transport: Option<Arc<dyn Transport>>,
    retry: Option<RetryConfig>,
    cache: Option<ResponseCache>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the access-token provider; without one every call is anonymous
    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Replace the reqwest transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override the retry policy derived from configuration
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Use this cache regardless of `cache.enabled`
    pub fn cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// `Configuration` for an unparsable base URL, invalid retry settings or
    /// a transport that cannot be constructed
    pub fn build(self) -> GroupVanResult<ApiClient> {
        let config = self.config.unwrap_or_default();
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| GroupVanError::from(InfraError::from(err)))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::from_timeouts(&config.timeouts)?),
        };
        let retry = match self.retry {
            Some(retry) => retry,
            None => retry_config(&config.retry)?,
        };
        let cache = self
            .cache
            .or_else(|| config.cache.enabled.then(|| ResponseCache::from_config(&config.cache)));

        Ok(ApiClient { base_url, pipeline: standard_pipeline(transport, self.auth, retry, cache) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = ClientConfig { base_url: base.to_string(), ..ClientConfig::default() };
        ApiClient::builder().config(config).build().unwrap()
    }

    #[test]
    fn url_for_keeps_base_path_prefix() {
        let client = client("https://api.groupvan.com/v3/");
        let url = client
            .url_for("/catalogs/search", &[("q".into(), "brake pads".into())])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.groupvan.com/v3/catalogs/search?q=brake+pads");
    }

    #[test]
    fn pipeline_order_is_fixed() {
        let client = client("https://api.groupvan.com/v3");
        assert_eq!(
            client.pipeline().stage_names(),
            vec!["correlation_id", "logging", "cache", "retry", "auth", "error_mapping", "transport"]
        );
    }

    #[test]
    fn invalid_base_url_is_configuration_error() {
        let config = ClientConfig { base_url: "not a url".into(), ..ClientConfig::default() };
        let err = ApiClient::builder().config(config).build().unwrap_err();
        assert_eq!(err.label(), "configuration");
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let unit: () = decode_json(b"").unwrap();
        assert_eq!(unit, ());
        let value: Option<u32> = decode_json(b" ").unwrap();
        assert_eq!(value, None);
        assert_eq!(decode_json::<u32>(b"{").unwrap_err().label(), "data");
    }
}
