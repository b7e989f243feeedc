//! Integration tests for the auth manager: sign-in, single-flight refresh,
//! sign-out and event delivery.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use futures::future::join_all;
use groupvan_common::error::AuthErrorKind;
use groupvan_common::time::MockClock;
use groupvan_core::auth::{AuthManager, MemoryTokenStorage};
use groupvan_domain::{AuthEvent, AuthEventKind, AuthStatus, SignOutOptions, TokenPair};
use support::{good_credentials, manager_with, FakeAuthEndpoint, SlowStorage, EPOCH};

/// Validates `AuthManager::get_valid_access_token` behavior for the
/// concurrent expired-token scenario.
///
/// Assertions:
/// - Sixteen concurrent callers trigger exactly one refresh call
/// - Every caller observes the same refreshed token
/// - Exactly one `TokenRefreshed` event is published
#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let endpoint = Arc::new(FakeAuthEndpoint::with_refresh_delay(Duration::from_millis(50)));
    let (manager, _storage, clock) = manager_with(endpoint.clone());
    manager.sign_in(&good_credentials()).await.unwrap();
    let mut events = manager.subscribe();

    clock.advance(Duration::from_secs(3400));

    let tokens = join_all((0..16).map(|_| manager.get_valid_access_token())).await;

    assert_eq!(endpoint.refreshes(), 1);
    for token in tokens {
        assert_eq!(token.unwrap(), "access-1");
    }
    assert_eq!(events.try_recv().map(|e| e.kind()), Some(AuthEventKind::TokenRefreshed));
    assert_eq!(events.try_recv(), None);
}

/// Validates `AuthManager::get_valid_access_token` behavior for the
/// multi-threaded refresh scenario.
///
/// Assertions:
/// - Callers on separate tasks still produce a single refresh
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_share_one_refresh() {
    let endpoint = Arc::new(FakeAuthEndpoint::with_refresh_delay(Duration::from_millis(100)));
    let (manager, _storage, clock) = manager_with(endpoint.clone());
    manager.sign_in(&good_credentials()).await.unwrap();
    clock.advance(Duration::from_secs(3599));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_valid_access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "access-1");
    }
    assert_eq!(endpoint.refreshes(), 1);
}

/// Validates `AuthManager::refresh` behavior for the sequential refresh
/// scenario.
///
/// Assertions:
/// - A second refresh after the first settles is a new network call
/// - The rotated refresh token is persisted
#[tokio::test]
async fn sequential_refreshes_are_not_coalesced() {
    let endpoint = Arc::new(FakeAuthEndpoint::default());
    let (manager, storage, _clock) = manager_with(endpoint.clone());
    manager.sign_in(&good_credentials()).await.unwrap();

    manager.refresh().await.unwrap();
    let status = manager.refresh().await.unwrap();

    assert_eq!(endpoint.refreshes(), 2);
    assert_eq!(status.access_token().map(|t| t.secret()), Some("access-2"));
    assert_eq!(storage.snapshot().unwrap().refresh_token.as_deref(), Some("refresh-2"));
}

/// Validates `AuthManager::sign_in` behavior for the successful sign-in
/// scenario.
///
/// Assertions:
/// - Exactly one `SignedIn` event is emitted
/// - The event carries the token expiry
/// - The status transitions to authenticated
#[tokio::test]
async fn sign_in_emits_exactly_one_signed_in() {
    let (manager, storage, _clock) = manager_with(Arc::new(FakeAuthEndpoint::default()));
    let mut events = manager.subscribe();
    assert_eq!(manager.status(), AuthStatus::Unauthenticated);

    let status = manager.sign_in(&good_credentials()).await.unwrap();

    match events.try_recv() {
        Some(AuthEvent::SignedIn { expires_at, .. }) => {
            assert_eq!(expires_at.timestamp(), EPOCH as i64 + 3600);
        }
        other => panic!("expected SignedIn, got {other:?}"),
    }
    assert_eq!(events.try_recv(), None);
    assert!(status.is_authenticated());
    assert!(storage.snapshot().is_some());
}

/// Validates `AuthManager::sign_in` behavior for the rejected credentials
/// scenario.
///
/// Assertions:
/// - The error is `Authentication(InvalidCredentials)`
/// - No event is emitted and nothing is stored
#[tokio::test]
async fn rejected_sign_in_reports_invalid_credentials() {
    let (manager, storage, _clock) = manager_with(Arc::new(FakeAuthEndpoint::default()));
    let mut events = manager.subscribe();

    let err = manager
        .sign_in(&groupvan_domain::Credentials::password("parts@shop.example", "nope"))
        .await
        .unwrap_err();

    assert_eq!(err.auth_kind(), Some(AuthErrorKind::InvalidCredentials));
    assert_eq!(events.try_recv(), None);
    assert!(storage.snapshot().is_none());
}

/// Validates `AuthManager::sign_out` behavior for the active session
/// scenario.
///
/// Assertions:
/// - Exactly one `SignedOut` event is emitted
/// - Storage is cleared
/// - A second sign-out emits nothing and does not fail
#[tokio::test]
async fn sign_out_emits_once_and_clears_storage() {
    let (manager, storage, _clock) = manager_with(Arc::new(FakeAuthEndpoint::default()));
    manager.sign_in(&good_credentials()).await.unwrap();
    let mut events = manager.subscribe();

    manager.sign_out(SignOutOptions::default()).await;
    manager.sign_out(SignOutOptions::default()).await;

    assert_eq!(events.try_recv(), Some(AuthEvent::SignedOut));
    assert_eq!(events.try_recv(), None);
    assert!(storage.snapshot().is_none());
    assert_eq!(storage.clear_count(), 2);
    assert!(!manager.is_authenticated());
}

/// Validates `AuthManager::sign_out` behavior for the failing revoke
/// scenario.
///
/// Assertions:
/// - The revoke endpoint is called once
/// - Its failure is swallowed and the local session still ends
#[tokio::test]
async fn sign_out_with_failing_revoke_still_signs_out() {
    let endpoint = Arc::new(FakeAuthEndpoint::default());
    endpoint.fail_revoke.store(true, Ordering::SeqCst);
    let (manager, storage, _clock) = manager_with(endpoint.clone());
    manager.sign_in(&good_credentials()).await.unwrap();

    manager.sign_out(SignOutOptions::revoke()).await;

    assert_eq!(endpoint.revokes(), 1);
    assert!(storage.snapshot().is_none());
    assert!(!manager.is_authenticated());
}

/// Validates `AuthManager::refresh` behavior for the unauthenticated
/// scenario.
///
/// Assertions:
/// - The result is `Unauthenticated`
/// - No network call is made and no event is emitted
#[tokio::test]
async fn refresh_while_unauthenticated_is_a_noop() {
    let endpoint = Arc::new(FakeAuthEndpoint::default());
    let (manager, _storage, _clock) = manager_with(endpoint.clone());
    let mut events = manager.subscribe();

    assert_eq!(manager.refresh().await.unwrap(), AuthStatus::Unauthenticated);

    assert_eq!(endpoint.refreshes(), 0);
    assert_eq!(events.try_recv(), None);
}

/// Validates `AuthManager::get_valid_access_token` behavior for the failed
/// refresh scenario.
///
/// Assertions:
/// - Every joined caller sees `Authentication(ExpiredToken)`
/// - Exactly one `SignedOut` event is emitted
/// - Storage is cleared
#[tokio::test]
async fn failed_refresh_signs_out_once() {
    let endpoint = Arc::new(FakeAuthEndpoint::with_refresh_delay(Duration::from_millis(20)));
    endpoint.fail_refresh.store(true, Ordering::SeqCst);
    let (manager, storage, clock) = manager_with(endpoint.clone());
    manager.sign_in(&good_credentials()).await.unwrap();
    let mut events = manager.subscribe();
    clock.advance(Duration::from_secs(3500));

    let results = join_all((0..4).map(|_| manager.get_valid_access_token())).await;

    for result in results {
        assert_eq!(result.unwrap_err().auth_kind(), Some(AuthErrorKind::ExpiredToken));
    }
    assert_eq!(endpoint.refreshes(), 1);
    assert_eq!(events.try_recv(), Some(AuthEvent::SignedOut));
    assert_eq!(events.try_recv(), None);
    assert!(storage.snapshot().is_none());
}

/// Validates `AuthManager::initialize` behavior for the persisted session
/// scenario.
///
/// Assertions:
/// - An expired persisted token is refreshed on first use
/// - Restoring emits no `SignedIn`
#[tokio::test]
async fn initialize_restores_and_refreshes_expired_session() {
    let endpoint = Arc::new(FakeAuthEndpoint::default());
    let expired = DateTime::from_timestamp(EPOCH as i64 - 10, 0).unwrap();
    let storage = Arc::new(MemoryTokenStorage::with_tokens(
        TokenPair::new("stale", Some("refresh-0".into())).with_expires_at(expired),
    ));
    let manager = AuthManager::builder(endpoint.clone(), storage.clone())
        .clock(Arc::new(MockClock::at_unix(EPOCH)))
        .build();
    let mut events = manager.subscribe();

    assert!(manager.initialize().await.unwrap().is_authenticated());
    assert_eq!(events.try_recv(), None);

    assert_eq!(manager.get_valid_access_token().await.unwrap(), "access-1");
    assert_eq!(endpoint.refreshes(), 1);
    assert_eq!(storage.snapshot().unwrap().access_token, "access-1");
}

/// Validates `AuthManager::sign_out` behavior for the refresh in flight
/// scenario.
///
/// Assertions:
/// - A refresh that settles after sign-out is discarded
/// - Storage stays empty
#[tokio::test]
async fn refresh_completing_after_sign_out_is_discarded() {
    let endpoint = Arc::new(FakeAuthEndpoint::with_refresh_delay(Duration::from_millis(50)));
    let (manager, storage, _clock) = manager_with(endpoint.clone());
    manager.sign_in(&good_credentials()).await.unwrap();

    let refreshing = tokio::spawn({
        let manager = manager.clone();
        async move { manager.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.sign_out(SignOutOptions::default()).await;

    let status = refreshing.await.unwrap().unwrap();
    assert_eq!(status, AuthStatus::Unauthenticated);
    assert!(!manager.is_authenticated());
    assert!(storage.snapshot().is_none());
}

/// Validates `AuthManager::sign_out` behavior for the refresh still
/// persisting scenario.
///
/// Assertions:
/// - Sign-out waits for the refresh's storage write, then clears it
/// - Storage is empty afterwards, so a restart restores nothing
/// - `SignedOut` is the last event delivered
#[tokio::test]
async fn sign_out_during_slow_refresh_persist_leaves_storage_empty() {
    let endpoint = Arc::new(FakeAuthEndpoint::default());
    let storage = Arc::new(SlowStorage::new(Duration::from_millis(50)));
    let manager = AuthManager::builder(endpoint.clone(), storage.clone())
        .clock(Arc::new(MockClock::at_unix(EPOCH)))
        .build();
    manager.sign_in(&good_credentials()).await.unwrap();
    let mut events = manager.subscribe();

    let refreshing = tokio::spawn({
        let manager = manager.clone();
        async move { manager.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.sign_out(SignOutOptions::default()).await;
    refreshing.await.unwrap().unwrap();

    assert_eq!(endpoint.refreshes(), 1);
    assert!(!manager.is_authenticated());
    assert!(storage.inner.snapshot().is_none());

    let mut kinds = Vec::new();
    while let Some(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds.last(), Some(&AuthEventKind::SignedOut));

    let restarted = AuthManager::builder(endpoint, storage).build();
    assert_eq!(restarted.initialize().await.unwrap(), AuthStatus::Unauthenticated);
}

/// Validates `AuthManager::sign_in` behavior for the active session
/// scenario.
///
/// Assertions:
/// - Signing in again emits `SignedOut` then `SignedIn`
/// - A rejected second sign-in keeps the existing session
#[tokio::test]
async fn sign_in_over_active_session_replaces_it() {
    let (manager, storage, _clock) = manager_with(Arc::new(FakeAuthEndpoint::default()));
    manager.sign_in(&good_credentials()).await.unwrap();
    let mut events = manager.subscribe();

    manager.sign_in(&good_credentials()).await.unwrap();
    assert_eq!(events.try_recv().map(|e| e.kind()), Some(AuthEventKind::SignedOut));
    assert_eq!(events.try_recv().map(|e| e.kind()), Some(AuthEventKind::SignedIn));
    assert_eq!(events.try_recv(), None);

    let err = manager
        .sign_in(&groupvan_domain::Credentials::password("parts@shop.example", "wrong"))
        .await
        .unwrap_err();
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::InvalidCredentials));
    assert!(manager.is_authenticated());
    assert_eq!(storage.snapshot().unwrap().access_token, "access-0");
    assert_eq!(events.try_recv(), None);
}

/// Validates `AuthManager::on_event` behavior for the misbehaving listener
/// scenario.
///
/// Assertions:
/// - A panicking callback does not stop delivery to other listeners
/// - An unread subscription does not block publishing
/// - Events arrive in publish order
#[tokio::test]
async fn misbehaving_listeners_do_not_block_others() {
    let (manager, _storage, _clock) = manager_with(Arc::new(FakeAuthEndpoint::default()));
    let panicking = manager.on_event(|_| panic!("listener bug"));
    let _never_read = manager.subscribe();
    let seen = Arc::new(AtomicUsize::new(0));
    let _counting = manager.on_event({
        let seen = seen.clone();
        move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });
    let mut ordered = manager.subscribe();

    manager.sign_in(&good_credentials()).await.unwrap();
    manager.refresh().await.unwrap();
    manager.sign_out(SignOutOptions::default()).await;

    let kinds: Vec<_> = (0..3).filter_map(|_| ordered.try_recv().map(|e| e.kind())).collect();
    assert_eq!(
        kinds,
        vec![AuthEventKind::SignedIn, AuthEventKind::TokenRefreshed, AuthEventKind::SignedOut]
    );

    for _ in 0..50 {
        if seen.load(Ordering::SeqCst) == 3 && panicking.is_finished() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert!(panicking.is_finished());
}

/// Validates `AuthSubscription` behavior for the unsubscribe scenario.
///
/// Assertions:
/// - Nothing is delivered after the subscription is cancelled
#[tokio::test]
async fn no_delivery_after_cancel() {
    let (manager, _storage, _clock) = manager_with(Arc::new(FakeAuthEndpoint::default()));
    let seen = Arc::new(AtomicUsize::new(0));
    let handle = manager.on_event({
        let seen = seen.clone();
        move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });
    handle.cancel();

    manager.sign_in(&good_credentials()).await.unwrap();
    tokio::task::yield_now().await;

    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

/// Validates `AuthManager::spawn_auto_refresh` behavior for the refresh
/// window scenario.
///
/// Assertions:
/// - The background task refreshes once the window opens
/// - `dispose` ends every subscription
#[tokio::test(start_paused = true)]
async fn auto_refresh_fires_when_window_opens() {
    let endpoint = Arc::new(FakeAuthEndpoint::default());
    let (manager, _storage, clock) = manager_with(endpoint.clone());
    manager.sign_in(&good_credentials()).await.unwrap();
    let mut events = manager.subscribe();

    manager.spawn_auto_refresh();
    clock.advance(Duration::from_secs(3300));

    let event = tokio::time::timeout(Duration::from_secs(4000), events.recv()).await.unwrap();
    assert_eq!(event.map(|e| e.kind()), Some(AuthEventKind::TokenRefreshed));
    assert_eq!(endpoint.refreshes(), 1);

    manager.dispose();
    assert_eq!(events.recv().await, None);
    assert!(!manager.is_authenticated());
}
