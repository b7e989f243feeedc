//! Token endpoint over HTTP
//!
//! Requests go through an [`ApiClient`] built without an access-token
//! provider, so the auth stage never runs for them and a token exchange can
//! never recurse into a refresh. Every call is flagged sensitive so bodies
//! holding passwords, assertions or tokens stay out of the log.

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;
use groupvan_core::auth::AuthEndpoint;
use groupvan_domain::constants::BEARER_PREFIX;
use groupvan_domain::{
    AuthConfig, ClientConfig, Credentials, HttpMethod, RefreshToken, TokenGrant, TokenPair,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::api::{ApiClient, RequestOptions};

#[derive(Serialize)]
#[serde(untagged)]
enum SignInBody<'a> {
    Password { username: &'a str, password: &'a str },
    Assertion { grant_type: &'static str, client_assertion: &'a str },
}

impl<'a> From<&'a Credentials> for SignInBody<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        match credentials {
            Credentials::Password { username, password } => Self::Password { username, password },
            Credentials::ClientAssertion { assertion } => {
                Self::Assertion { grant_type: "client_assertion", client_assertion: assertion }
            }
        }
    }
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct RevokeBody<'a> {
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

/// [`AuthEndpoint`] speaking JSON to the GroupVAN token routes
#[derive(Debug)]
pub struct HttpAuthEndpoint {
    client: ApiClient,
    sign_in_path: String,
    refresh_path: String,
    revoke_path: String,
}

impl HttpAuthEndpoint {
    /// `client` must not carry an access-token provider
    pub fn new(client: ApiClient, auth: &AuthConfig) -> Self {
        Self {
            client,
            sign_in_path: auth.sign_in_path.clone(),
            refresh_path: auth.refresh_path.clone(),
            revoke_path: auth.revoke_path.clone(),
        }
    }

    /// Endpoint with its own anonymous client built from `config`
    pub fn from_config(config: &ClientConfig) -> GroupVanResult<Self> {
        let client = ApiClient::from_config(config, None)?;
        Ok(Self::new(client, &config.auth))
    }

    async fn exchange<B: Serialize>(&self, path: &str, body: &B) -> GroupVanResult<TokenGrant> {
        let options = RequestOptions::new().unauthenticated().sensitive().json(body)?;
        let response =
            self.client.request::<TokenGrant>(HttpMethod::Post, path, options).await?;
        Ok(response.data)
    }
}

#[async_trait]
impl AuthEndpoint for HttpAuthEndpoint {
    #[instrument(skip_all, fields(path = %self.sign_in_path))]
    async fn sign_in(&self, credentials: &Credentials) -> GroupVanResult<TokenGrant> {
        let grant = self.exchange(&self.sign_in_path, &SignInBody::from(credentials)).await?;
        debug!(expires_in = ?grant.expires_in, "token grant received");
        Ok(grant)
    }

    #[instrument(skip_all, fields(path = %self.refresh_path))]
    async fn refresh(&self, refresh_token: &RefreshToken) -> GroupVanResult<TokenGrant> {
        self.exchange(&self.refresh_path, &RefreshBody { refresh_token: refresh_token.secret() })
            .await
    }

    #[instrument(skip_all, fields(path = %self.revoke_path))]
    async fn revoke(&self, tokens: &TokenPair) -> GroupVanResult<()> {
        let body = RevokeBody {
            token: &tokens.access_token,
            refresh_token: tokens.refresh_token.as_deref(),
        };
        let options = RequestOptions::new()
            .unauthenticated()
            .sensitive()
            .header("Authorization", format!("{BEARER_PREFIX}{}", tokens.access_token))
            .json(&body)?;
        self.client
            .request_with(HttpMethod::Post, &self.revoke_path, options, |_| Ok(()))
            .await?;
        Ok(())
    }
}
