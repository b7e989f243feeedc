//! Auth-attach stage
//!
//! Suspends until the token provider hands out a valid access token, then
//! sends it as `Authorization: Bearer <token>`. A 401 from the API forces
//! one refresh and one replay; a second 401 is surfaced. 403 is never
//! replayed.

use std::sync::Arc;

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;
use groupvan_core::auth::AccessTokenProvider;
use groupvan_domain::constants::{BEARER_PREFIX, HEADER_AUTHORIZATION};
use tracing::info;

use crate::api::pipeline::{Interceptor, Next};
use crate::api::request::{ApiRequest, ApiResponse};

#[derive(Clone, Default)]
pub struct AuthInterceptor {
    provider: Option<Arc<dyn AccessTokenProvider>>,
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor").field("enabled", &self.provider.is_some()).finish()
    }
}

impl AuthInterceptor {
    /// `None` sends every request anonymously
    pub fn new(provider: Option<Arc<dyn AccessTokenProvider>>) -> Self {
        Self { provider }
    }
}

fn attach(request: &mut ApiRequest, token: &str) -> GroupVanResult<()> {
    request.set_header(HEADER_AUTHORIZATION, &format!("{BEARER_PREFIX}{token}"))
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn intercept(&self, mut request: ApiRequest, next: Next<'_>) -> GroupVanResult<ApiResponse> {
        let Some(provider) = self.provider.as_ref().filter(|_| request.authenticated) else {
            return next.run(request).await;
        };

        let token = provider.access_token().await?;
        attach(&mut request, &token)?;

        match next.run(request.clone()).await {
            Err(err) if err.is_token_rejection() => {
                info!(error = %err, "access token rejected; refreshing and replaying once");
                let refreshed = provider.refresh_after_rejection(&token).await?;
                attach(&mut request, &refreshed)?;
                next.run(request).await
            }
            other => other,
        }
    }
}
