//! Side-effect dispatcher: a process-wide publish/subscribe bus.
//!
//! The store publishes [`AppEvent`]s on watched-field transitions; the host
//! application subscribes wherever it needs to react (telemetry client, "what's
//! new" banner).  The store never subscribes to its own events.
//!
//! # Delivery
//!
//! `publish` invokes every subscriber registered at the moment of the call,
//! exactly once, in registration order, on the calling thread, and returns
//! after the last one.  There is no queueing and no retry.
//!
//! The subscriber list is snapshotted before delivery, so a subscriber may
//! publish, subscribe, or unsubscribe from inside its callback without
//! deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use kubedesk_core::AppEvent;
use tracing::debug;

/// Callback invoked for every published event.
pub type Subscriber = Arc<dyn Fn(&AppEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The publish/subscribe bus.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber`; it receives every event published from now on.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(subscriber)));
        id
    }

    /// Removes a subscriber.  Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Delivers `event` to every current subscriber before returning.
    pub fn publish(&self, event: &AppEvent) {
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();

        debug!(
            event = %event.name(),
            subscribers = snapshot.len(),
            "publishing event"
        );
        for subscriber in snapshot {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
