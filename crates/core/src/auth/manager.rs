//! Token lifecycle manager
//!
//! Owns the single live [`AuthStatus`] of a client:
//! - Sign-in against the auth endpoint, persisting the pair to storage
//! - Refresh ahead of expiry, with every concurrent caller sharing one
//!   in-flight refresh
//! - Sign-out, optionally revoking the session remotely
//! - Broadcast of every transition to subscribers
//!
//! ```text
//! Unauthenticated --sign_in--> Authenticated --refresh ok--> Authenticated
//!        ^                                |
//!        +------ refresh failure / sign_out
//! ```
//!
//! # Single-flight refresh
//!
//! The refresh gate holds a [`Shared`] future. The first caller that finds
//! the gate empty creates the refresh future and stores it; every later
//! caller clones the stored handle and awaits the same outcome. The future
//! clears the gate itself once it settles. The gate lock is never held
//! across an await.
//!
//! # Transitions
//!
//! Every transition commits under one async transition lock: the in-memory
//! swap, the storage write or clear, and the event. A refresh that lost a
//! race with sign-out therefore never writes tokens back after storage was
//! cleared, and subscribers see events in commit order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use groupvan_common::error::{AuthErrorKind, GroupVanError, GroupVanResult};
use groupvan_common::time::{Clock, SystemClock};
use groupvan_domain::constants::{DEFAULT_REFRESH_SKEW_SECS, FALLBACK_ACCESS_TOKEN_TTL_SECS};
use groupvan_domain::{
    AccessToken, AuthEvent, AuthStatus, Credentials, RefreshToken, SignOutOptions, TokenClaims,
    TokenGrant, TokenPair,
};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::claims;
use super::events::{AuthEventBus, AuthSubscription, ListenerHandle};
use super::ports::{AccessTokenProvider, AuthEndpoint, TokenStorage};

type SharedRefresh = Shared<BoxFuture<'static, GroupVanResult<AuthStatus>>>;

#[derive(Clone)]
struct Session {
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    /// When `get_valid_access_token` stops handing out this token
    refresh_at: DateTime<Utc>,
}

impl Session {
    fn to_pair(&self) -> TokenPair {
        TokenPair::new(
            self.access_token.secret(),
            self.refresh_token.as_ref().map(|r| r.secret().to_string()),
        )
        .with_expires_at(self.access_token.expires_at())
    }

    fn status(&self) -> AuthStatus {
        AuthStatus::Authenticated { access_token: self.access_token.clone() }
    }
}

fn status_of(session: Option<&Session>) -> AuthStatus {
    session.map_or(AuthStatus::Unauthenticated, Session::status)
}

fn not_authenticated() -> GroupVanError {
    GroupVanError::auth(AuthErrorKind::NotAuthenticated, "no active session; sign in first")
}

/// Sign-in rejections (400/401) are reported as bad credentials
fn map_sign_in_error(err: GroupVanError) -> GroupVanError {
    match err {
        GroupVanError::Http { status: 400, message, .. } => {
            GroupVanError::auth(AuthErrorKind::InvalidCredentials, message)
        }
        GroupVanError::Authentication {
            kind:
                AuthErrorKind::InvalidToken
                | AuthErrorKind::ExpiredToken
                | AuthErrorKind::InvalidCredentials,
            message,
        } => GroupVanError::auth(AuthErrorKind::InvalidCredentials, message),
        other => other,
    }
}

struct Inner {
    endpoint: Arc<dyn AuthEndpoint>,
    storage: Arc<dyn TokenStorage>,
    clock: Arc<dyn Clock>,
    refresh_skew: Duration,
    session: RwLock<Option<Session>>,
    /// Bumped under the session write lock whenever the session identity
    /// changes (sign-in, sign-out, expiry, dispose)
    epoch: AtomicU64,
    refresh_gate: Mutex<Option<SharedRefresh>>,
    /// Held from a transition's session swap until its event is published
    transitions: tokio::sync::Mutex<()>,
    events: Arc<AuthEventBus>,
    auto_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.clock.system_time())
    }

    fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Refresh point for a token, never earlier than half its lifetime
    fn refresh_at(&self, expires_at: DateTime<Utc>, issued_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let skew = match issued_at.and_then(|iat| (expires_at - iat).to_std().ok()) {
            Some(lifetime) => self.refresh_skew.min(lifetime / 2),
            None => self.refresh_skew,
        };
        chrono::Duration::from_std(skew)
            .ok()
            .and_then(|skew| expires_at.checked_sub_signed(skew))
            .unwrap_or(expires_at)
    }

    fn session_from_grant(&self, grant: &TokenGrant, refresh_token: Option<RefreshToken>) -> Session {
        let now = self.now();
        let claims = claims::decode_unverified(&grant.access_token).unwrap_or_default();
        let expires_at = grant
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| now.checked_add_signed(chrono::Duration::seconds(secs)))
            .or_else(|| claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)))
            .unwrap_or_else(|| {
                now + chrono::Duration::seconds(FALLBACK_ACCESS_TOKEN_TTL_SECS as i64)
            });
        let refresh_at = self.refresh_at(expires_at, Some(now));
        Session {
            access_token: AccessToken::new(grant.access_token.clone(), expires_at, claims),
            refresh_token,
            refresh_at,
        }
    }

    /// Rebuild a session from storage; unknown expiry means "refresh now"
    fn session_from_pair(&self, pair: &TokenPair) -> Session {
        let claims: TokenClaims = claims::decode_unverified(&pair.access_token).unwrap_or_default();
        let expires_at = pair
            .expires_at
            .or(claims.exp)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| self.now());
        let issued_at = claims.iat.and_then(|iat| DateTime::from_timestamp(iat, 0));
        let refresh_at = self.refresh_at(expires_at, issued_at);
        Session {
            access_token: AccessToken::new(pair.access_token.clone(), expires_at, claims),
            refresh_token: pair.refresh_token.clone().map(RefreshToken::new),
            refresh_at,
        }
    }

    /// Install `session` as a new identity and return its status
    fn replace_session(&self, session: Option<Session>) -> Option<Session> {
        let mut guard = self.session.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        std::mem::replace(&mut *guard, session)
    }

    async fn perform_refresh(&self) -> GroupVanResult<AuthStatus> {
        let (epoch, session) = {
            let guard = self.session.read();
            (self.epoch.load(Ordering::SeqCst), guard.clone())
        };

        let Some(session) = session else {
            debug!("refresh requested while unauthenticated");
            return Ok(AuthStatus::Unauthenticated);
        };

        let Some(refresh_token) = session.refresh_token else {
            self.expire(epoch, "no refresh token available").await;
            return Err(GroupVanError::auth(
                AuthErrorKind::ExpiredToken,
                "access token expired and no refresh token is available",
            ));
        };

        info!("refreshing access token");
        let grant = match self.endpoint.refresh(&refresh_token).await {
            Ok(grant) => grant,
            Err(err) => {
                warn!(error = %err, label = err.label(), "token refresh failed");
                self.expire(epoch, "refresh failed").await;
                return Err(GroupVanError::auth(
                    AuthErrorKind::ExpiredToken,
                    format!("token refresh failed: {err}"),
                ));
            }
        };

        // Keep the old refresh token when the server does not rotate it
        let next_refresh = grant.refresh_token.clone().map(RefreshToken::new).or(Some(refresh_token));
        let refreshed = self.session_from_grant(&grant, next_refresh);

        let _transition = self.transitions.lock().await;
        {
            let mut guard = self.session.write();
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!("session changed during refresh; discarding refreshed token");
                return Ok(status_of(guard.as_ref()));
            }
            *guard = Some(refreshed.clone());
        }

        if let Err(err) = self.storage.store_tokens(&refreshed.to_pair()).await {
            warn!(error = %err, "failed to persist refreshed tokens");
        }

        let expires_at = refreshed.access_token.expires_at();
        self.events.publish(&AuthEvent::TokenRefreshed { expires_at });
        info!(%expires_at, "access token refreshed");
        Ok(refreshed.status())
    }

    /// Drop the session if it is still the one observed at `epoch`
    async fn expire(&self, epoch: u64, reason: &str) {
        let _transition = self.transitions.lock().await;
        let expired = {
            let mut guard = self.session.write();
            if self.epoch.load(Ordering::SeqCst) == epoch && guard.is_some() {
                *guard = None;
                self.epoch.fetch_add(1, Ordering::SeqCst);
                true
            } else {
                false
            }
        };

        if expired {
            if let Err(err) = self.storage.clear_tokens().await {
                warn!(error = %err, "failed to clear token storage");
            }
            self.events.publish(&AuthEvent::SignedOut);
            info!(reason, "session ended");
        }
    }

    /// How long until the current token enters its refresh window
    fn time_until_refresh(&self) -> Option<Duration> {
        let now = self.now();
        self.session
            .read()
            .as_ref()
            .map(|s| (s.refresh_at - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.auto_refresh.get_mut().take() {
            task.abort();
        }
    }
}

/// Builder for [`AuthManager`]
pub struct AuthManagerBuilder {
    endpoint: Arc<dyn AuthEndpoint>,
    storage: Arc<dyn TokenStorage>,
    clock: Arc<dyn Clock>,
    refresh_skew: Duration,
}

impl AuthManagerBuilder {
    /// Refresh this long before expiry (default 5 minutes)
    pub fn refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> AuthManager {
        AuthManager {
            inner: Arc::new(Inner {
                endpoint: self.endpoint,
                storage: self.storage,
                clock: self.clock,
                refresh_skew: self.refresh_skew,
                session: RwLock::new(None),
                epoch: AtomicU64::new(0),
                refresh_gate: Mutex::new(None),
                transitions: tokio::sync::Mutex::new(()),
                events: AuthEventBus::new(),
                auto_refresh: Mutex::new(None),
            }),
        }
    }
}

/// Token lifecycle manager
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct AuthManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("authenticated", &self.status().is_authenticated())
            .field("refresh_skew", &self.inner.refresh_skew)
            .finish()
    }
}

impl AuthManager {
    pub fn builder(
        endpoint: Arc<dyn AuthEndpoint>,
        storage: Arc<dyn TokenStorage>,
    ) -> AuthManagerBuilder {
        AuthManagerBuilder {
            endpoint,
            storage,
            clock: Arc::new(SystemClock),
            refresh_skew: Duration::from_secs(DEFAULT_REFRESH_SKEW_SECS),
        }
    }

    /// Manager with the system clock and the default refresh skew
    pub fn new(endpoint: Arc<dyn AuthEndpoint>, storage: Arc<dyn TokenStorage>) -> Self {
        Self::builder(endpoint, storage).build()
    }

    /// Restore a persisted session, if any
    ///
    /// Restoring does not emit `SignedIn`.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> GroupVanResult<AuthStatus> {
        let _transition = self.inner.transitions.lock().await;
        match self.inner.storage.get_tokens().await? {
            Some(pair) => {
                let session = self.inner.session_from_pair(&pair);
                let status = session.status();
                self.inner.replace_session(Some(session));
                info!(expires_at = ?status.expires_at(), "restored persisted session");
                Ok(status)
            }
            None => {
                debug!("no persisted session");
                Ok(self.status())
            }
        }
    }

    /// Exchange credentials for a session
    ///
    /// Signing in over an active session is a sign-out followed by a
    /// sign-in: the new pair overwrites storage and subscribers see
    /// `SignedOut` then `SignedIn`. The old session is not revoked remotely.
    /// A rejected sign-in leaves any active session untouched.
    ///
    /// # Errors
    /// `Authentication(InvalidCredentials)` when the endpoint rejects the
    /// credentials (HTTP 400/401). Storage failures leave the manager's
    /// state unchanged.
    #[instrument(skip(self, credentials), fields(grant_type = credentials.grant_type()))]
    pub async fn sign_in(&self, credentials: &Credentials) -> GroupVanResult<AuthStatus> {
        let grant = self.inner.endpoint.sign_in(credentials).await.map_err(map_sign_in_error)?;
        let refresh_token = grant.refresh_token.clone().map(RefreshToken::new);
        let session = self.inner.session_from_grant(&grant, refresh_token);

        let _transition = self.inner.transitions.lock().await;
        self.inner.storage.store_tokens(&session.to_pair()).await?;
        let previous = self.inner.replace_session(Some(session.clone()));

        if previous.is_some() {
            self.inner.events.publish(&AuthEvent::SignedOut);
            info!("previous session replaced");
        }
        let expires_at = session.access_token.expires_at();
        self.inner.events.publish(&AuthEvent::SignedIn {
            claims: session.access_token.claims().clone(),
            expires_at,
        });
        info!(%expires_at, "signed in");
        Ok(session.status())
    }

    /// Current access token, refreshing first if it is inside the refresh
    /// window
    ///
    /// # Errors
    /// `Authentication(NotAuthenticated)` without a session,
    /// `Authentication(ExpiredToken)` when the refresh fails.
    pub async fn get_valid_access_token(&self) -> GroupVanResult<String> {
        let now = self.inner.now();
        let stale = match self.inner.current_session() {
            None => return Err(not_authenticated()),
            Some(session) if now < session.refresh_at => {
                return Ok(session.access_token.secret().to_string());
            }
            Some(session) => session.access_token.secret().to_string(),
        };

        debug!("access token inside refresh window");
        self.token_after_refresh(Some(&stale)).await
    }

    /// Refresh the session now, joining any refresh already in flight
    ///
    /// A refresh while unauthenticated resolves to `Unauthenticated` without
    /// a network call. On failure the manager signs out and returns
    /// `Authentication(ExpiredToken)`.
    pub async fn refresh(&self) -> GroupVanResult<AuthStatus> {
        self.refresh_from(None).await
    }

    /// `stale` is the token the caller saw; if the session already moved past
    /// it, the current status is returned without starting a new refresh
    async fn refresh_from(&self, stale: Option<&str>) -> GroupVanResult<AuthStatus> {
        let pending = {
            let mut gate = self.inner.refresh_gate.lock();
            if let Some(pending) = gate.as_ref() {
                debug!("joining in-flight token refresh");
                pending.clone()
            } else {
                if let (Some(stale), Some(current)) = (stale, self.inner.current_session()) {
                    if current.access_token.secret() != stale && self.inner.now() < current.refresh_at {
                        return Ok(current.status());
                    }
                }

                let inner = Arc::clone(&self.inner);
                let pending = async move {
                    let outcome = inner.perform_refresh().await;
                    inner.refresh_gate.lock().take();
                    outcome
                }
                .boxed()
                .shared();
                *gate = Some(pending.clone());
                pending
            }
        };

        pending.await
    }

    async fn token_after_refresh(&self, stale: Option<&str>) -> GroupVanResult<String> {
        match self.refresh_from(stale).await? {
            AuthStatus::Authenticated { access_token } => Ok(access_token.secret().to_string()),
            AuthStatus::Unauthenticated => Err(not_authenticated()),
        }
    }

    /// End the session
    ///
    /// Always clears storage. Never fails: storage and revoke errors are
    /// logged. Emits `SignedOut` only if a session was active. Revocation
    /// runs after the local transition has committed.
    #[instrument(skip(self))]
    pub async fn sign_out(&self, options: SignOutOptions) {
        let previous = {
            let _transition = self.inner.transitions.lock().await;
            let previous = self.inner.replace_session(None);

            if let Err(err) = self.inner.storage.clear_tokens().await {
                warn!(error = %err, "failed to clear token storage");
            }
            if previous.is_some() {
                self.inner.events.publish(&AuthEvent::SignedOut);
            }
            previous
        };

        let Some(session) = previous else { return };
        if options.revoke_remote {
            if let Err(err) = self.inner.endpoint.revoke(&session.to_pair()).await {
                warn!(error = %err, label = err.label(), "remote token revocation failed");
            }
        }
        info!(revoked = options.revoke_remote, "signed out");
    }

    pub fn status(&self) -> AuthStatus {
        status_of(self.inner.session.read().as_ref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.read().is_some()
    }

    /// Listen for auth-state transitions
    pub fn subscribe(&self) -> AuthSubscription {
        self.inner.events.subscribe()
    }

    /// Run `callback` for every transition on its own task
    ///
    /// Requires a Tokio runtime.
    pub fn on_event<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(AuthEvent) + Send + Sync + 'static,
    {
        ListenerHandle::spawn(self.subscribe(), callback)
    }

    /// Start a background task that refreshes ahead of expiry
    ///
    /// Sleeps until the refresh window opens and wakes early on any auth
    /// event. Idempotent while the task is running. Requires a Tokio runtime.
    pub fn spawn_auto_refresh(&self) {
        let mut slot = self.inner.auto_refresh.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let events = self.inner.events.subscribe();
        *slot = Some(tokio::spawn(auto_refresh_loop(weak, events)));
        info!("token auto-refresh started");
    }

    /// Stop background work, close every subscription and forget the
    /// in-memory session; persisted tokens are kept
    pub fn dispose(&self) {
        if let Some(task) = self.inner.auto_refresh.lock().take() {
            task.abort();
        }
        self.inner.replace_session(None);
        self.inner.events.close();
        debug!("auth manager disposed");
    }
}

async fn auto_refresh_loop(inner: Weak<Inner>, mut events: AuthSubscription) {
    loop {
        let wait = match inner.upgrade() {
            Some(inner) => inner.time_until_refresh(),
            None => return,
        };

        match wait {
            // Unauthenticated: nothing to do until the next transition
            None => {
                if events.recv().await.is_none() {
                    return;
                }
            }
            Some(wait) => {
                debug!(wait_secs = wait.as_secs(), "auto-refresh sleeping");
                tokio::select! {
                    () = tokio::time::sleep(wait) => {
                        let Some(inner) = inner.upgrade() else { return };
                        let manager = AuthManager { inner };
                        if let Err(err) = manager.get_valid_access_token().await {
                            warn!(error = %err, "auto-refresh failed");
                        }
                    }
                    event = events.recv() => {
                        if event.is_none() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl AccessTokenProvider for AuthManager {
    async fn access_token(&self) -> GroupVanResult<String> {
        self.get_valid_access_token().await
    }

    async fn refresh_after_rejection(&self, rejected: &str) -> GroupVanResult<String> {
        if !self.is_authenticated() {
            return Err(not_authenticated());
        }
        debug!("access token rejected by API; forcing refresh");
        self.token_after_refresh(Some(rejected)).await
    }
}
