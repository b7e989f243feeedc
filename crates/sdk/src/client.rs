//! The `GroupVan` handle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_common::validation::ObjectValidator;
use groupvan_core::auth::{AccessTokenProvider, AuthManager, AuthSubscription};
use groupvan_domain::{
    AuthStatus, ClientConfig, Credentials, GroupVanResponse, HttpMethod, JwtMode, SignOutOptions,
};
use groupvan_infra::api::{ApiClient, RequestOptions};
use groupvan_infra::auth::HttpAuthEndpoint;
use groupvan_infra::jwt::{JwtIssuer, JwtTokenProvider};
use groupvan_infra::{config, storage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, instrument};

struct Inner {
    config: ClientConfig,
    auth: AuthManager,
    client: ApiClient,
    issuer: Option<Arc<JwtIssuer>>,
    disposed: AtomicBool,
}

/// One configured GroupVAN client
///
/// Cheap to clone; clones share the session, the pipeline and the cache.
#[derive(Clone)]
pub struct GroupVan {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GroupVan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupVan")
            .field("base_url", &self.inner.config.base_url)
            .field("auth", &self.inner.auth)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl GroupVan {
    /// Build a handle from `config` and restore any persisted session
    ///
    /// With `jwt.mode = "direct"` requests are authorized by self-issued
    /// client assertions and the session is not consulted.
    ///
    /// # Errors
    /// `Configuration` for an invalid config or unreadable JWT key,
    /// `Storage` when the persisted session cannot be read.
    #[instrument(skip(config), fields(base_url = %config.base_url))]
    pub async fn init(config: ClientConfig) -> GroupVanResult<Self> {
        config::validate(&config)?;

        let storage = storage::build_storage(&config.storage)?;
        let endpoint = Arc::new(HttpAuthEndpoint::from_config(&config)?);
        let auth = AuthManager::builder(endpoint, storage)
            .refresh_skew(config.auth.refresh_skew())
            .build();
        auth.initialize().await?;
        if config.auth.auto_refresh {
            auth.spawn_auto_refresh();
        }

        let issuer = config.jwt.as_ref().map(JwtIssuer::new).transpose()?.map(Arc::new);
        let direct = config.jwt.as_ref().is_some_and(|jwt| jwt.mode == JwtMode::Direct);
        let provider: Arc<dyn AccessTokenProvider> = match issuer.as_ref().filter(|_| direct) {
            Some(issuer) => {
                Arc::new(JwtTokenProvider::new(Arc::clone(issuer), config.auth.refresh_skew()))
            }
            None => Arc::new(auth.clone()),
        };
        let client = ApiClient::from_config(&config, Some(provider))?;

        info!(authenticated = auth.is_authenticated(), direct, "GroupVAN client initialized");
        Ok(Self {
            inner: Arc::new(Inner { config, auth, client, issuer, disposed: AtomicBool::new(false) }),
        })
    }

    /// [`init`](Self::init) with configuration from [`config::load`]
    pub async fn from_env() -> GroupVanResult<Self> {
        Self::init(config::load()?).await
    }

    /// Stop background refresh and close event streams
    ///
    /// Persisted tokens are kept. Later calls on any clone of this handle
    /// fail with `NotInitialized`.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.auth.dispose();
            info!("GroupVAN client disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn auth(&self) -> &AuthManager {
        &self.inner.auth
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.client
    }

    /// The client-assertion issuer, present when `jwt` is configured
    pub fn issuer(&self) -> Option<&JwtIssuer> {
        self.inner.issuer.as_deref()
    }

    /// Whether requests carry self-issued assertions rather than the session
    pub fn uses_direct_assertions(&self) -> bool {
        self.inner.config.jwt.as_ref().is_some_and(|jwt| jwt.mode == JwtMode::Direct)
    }

    fn live(&self) -> GroupVanResult<&Inner> {
        if self.is_disposed() {
            Err(GroupVanError::NotInitialized)
        } else {
            Ok(&self.inner)
        }
    }

    // Auth --------------------------------------------------------------

    pub async fn sign_in(&self, credentials: &Credentials) -> GroupVanResult<AuthStatus> {
        self.live()?.auth.sign_in(credentials).await
    }

    /// Sign in with a freshly issued client assertion
    ///
    /// # Errors
    /// `Configuration` when no `jwt` section is configured.
    pub async fn sign_in_with_assertion(&self) -> GroupVanResult<AuthStatus> {
        let inner = self.live()?;
        let issuer = inner.issuer.as_ref().ok_or_else(|| {
            GroupVanError::config_field("jwt", "client assertions need a jwt section")
        })?;
        inner.auth.sign_in(&Credentials::client_assertion(issuer.issue()?)).await
    }

    pub async fn sign_out(&self, options: SignOutOptions) {
        if let Ok(inner) = self.live() {
            inner.auth.sign_out(options).await;
        }
    }

    pub fn status(&self) -> AuthStatus {
        self.inner.auth.status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_authenticated()
    }

    pub fn subscribe(&self) -> AuthSubscription {
        self.inner.auth.subscribe()
    }

    // Requests ----------------------------------------------------------

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> GroupVanResult<GroupVanResponse<T>> {
        self.live()?.client.request(method, path, options).await
    }

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
        self.live()?.client.request_validated(method, path, input, validator, options).await
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
        self.live()?.client.post(path, body).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> GroupVanResult<GroupVanResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.live()?.client.put(path, body).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> GroupVanResult<GroupVanResponse<T>> {
        self.request(HttpMethod::Delete, path, options).await
    }
}
