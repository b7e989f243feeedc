//! Direct-assertion access tokens
//!
//! In `JwtMode::Direct` there is no session: every request carries a
//! client assertion signed by [`JwtIssuer`]. The provider keeps the last
//! token and issues a new one once it is within `skew` of `exp`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;
use groupvan_core::auth::AccessTokenProvider;
use parking_lot::Mutex;
use tracing::debug;

use super::issuer::JwtIssuer;

#[derive(Debug, Clone)]
struct Issued {
    token: String,
    exp: i64,
}

/// [`AccessTokenProvider`] backed by a [`JwtIssuer`] instead of a session
#[derive(Debug)]
pub struct JwtTokenProvider {
    issuer: Arc<JwtIssuer>,
    skew: Duration,
    current: Mutex<Option<Issued>>,
}

impl JwtTokenProvider {
    /// `skew` is capped at half the issuer's lifetime so a cached token is
    /// always reused for a while.
    pub fn new(issuer: Arc<JwtIssuer>, skew: Duration) -> Self {
        let skew = skew.min(issuer.lifetime() / 2);
        Self { issuer, skew, current: Mutex::new(None) }
    }

    pub fn skew(&self) -> Duration {
        self.skew
    }

    fn fresh(&self, issued: &Issued) -> bool {
        let skew = i64::try_from(self.skew.as_secs()).unwrap_or(i64::MAX);
        self.issuer.now() < issued.exp.saturating_sub(skew)
    }

    fn reissue(&self) -> GroupVanResult<String> {
        let (token, claims) = self.issuer.mint(self.issuer.lifetime())?;
        *self.current.lock() = Some(Issued { token: token.clone(), exp: claims.exp });
        debug!(exp = claims.exp, "direct assertion reissued");
        Ok(token)
    }
}

#[async_trait]
impl AccessTokenProvider for JwtTokenProvider {
    async fn access_token(&self) -> GroupVanResult<String> {
        if let Some(issued) = self.current.lock().clone().filter(|issued| self.fresh(issued)) {
            return Ok(issued.token);
        }
        self.reissue()
    }

    async fn refresh_after_rejection(&self, rejected: &str) -> GroupVanResult<String> {
        // A concurrent call may already have replaced the rejected token.
        if let Some(issued) = self
            .current
            .lock()
            .clone()
            .filter(|issued| issued.token != rejected && self.fresh(issued))
        {
            return Ok(issued.token);
        }
        self.reissue()
    }
}
