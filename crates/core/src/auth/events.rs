//! Auth-state event broadcast
//!
//! Each subscriber owns an unbounded channel, so delivery is FIFO per
//! listener and publishing never waits on a slow consumer. Dropping or
//! cancelling a subscription removes its sender; nothing is delivered to it
//! afterwards.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use groupvan_domain::AuthEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

struct Listener {
    id: u64,
    tx: mpsc::UnboundedSender<AuthEvent>,
}

/// Fan-out of [`AuthEvent`]s to any number of subscribers
#[derive(Default)]
pub struct AuthEventBus {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl AuthEventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new listener
    pub fn subscribe(self: &Arc<Self>) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Listener { id, tx });
        AuthSubscription { id, rx, bus: Arc::downgrade(self) }
    }

    /// Deliver `event` to every live listener
    pub fn publish(&self, event: &AuthEvent) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| listener.tx.send(event.clone()).is_ok());
        trace!(kind = %event.kind(), listeners = listeners.len(), "auth event published");
    }

    /// Drop every listener; their streams end once drained
    pub fn close(&self) {
        self.listeners.lock().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn remove(&self, id: u64) {
        self.listeners.lock().retain(|listener| listener.id != id);
    }
}

impl std::fmt::Debug for AuthEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEventBus").field("listeners", &self.listener_count()).finish()
    }
}

/// One listener's view of the event stream
///
/// Also usable as a [`Stream`]. The stream ends when the auth manager is
/// disposed.
#[derive(Debug)]
pub struct AuthSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<AuthEvent>,
    bus: Weak<AuthEventBus>,
}

impl AuthSubscription {
    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop listening
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

impl Stream for AuthSubscription {
    type Item = AuthEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A callback listener running on its own task
///
/// A slow or panicking callback only affects its own task. Dropping the
/// handle cancels the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Drive `subscription` on a new task, invoking `callback` per event
    pub fn spawn<F>(mut subscription: AuthSubscription, callback: F) -> Self
    where
        F: Fn(AuthEvent) + Send + Sync + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                callback(event);
            }
        });
        Self { task }
    }

    /// Stop the listener
    pub fn cancel(self) {
        drop(self);
    }

    /// True once the listener task has ended (cancelled, panicked or the
    /// stream closed)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn delivers_in_order_to_each_listener() {
        let bus = AuthEventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(&AuthEvent::SignedOut);
        bus.publish(&AuthEvent::TokenRefreshed { expires_at: chrono::Utc::now() });

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await.map(|e| e.kind().to_string()).as_deref(), Some("signed_out"));
            assert_eq!(
                sub.recv().await.map(|e| e.kind().to_string()).as_deref(),
                Some("token_refreshed")
            );
        }
    }

    #[tokio::test]
    async fn cancel_removes_listener() {
        let bus = AuthEventBus::new();
        let sub = bus.subscribe();
        let _other = bus.subscribe();
        assert_eq!(bus.listener_count(), 2);

        sub.cancel();
        assert_eq!(bus.listener_count(), 1);
        bus.publish(&AuthEvent::SignedOut);
        assert_eq!(bus.listener_count(), 1);
    }

    #[tokio::test]
    async fn close_ends_streams() {
        let bus = AuthEventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(&AuthEvent::SignedOut);
        bus.close();

        assert_eq!(sub.next().await, Some(AuthEvent::SignedOut));
        assert_eq!(sub.next().await, None);
    }
}
