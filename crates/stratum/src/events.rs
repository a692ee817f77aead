// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Local change events.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;
use stratum_backplane::{ChangeAction, ChangeNotification};
use stratum_tier::CacheKey;

/// Where a change originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventOrigin {
    /// The change was made through this manager.
    Local,
    /// The change was made by another process and arrived through the backplane.
    Remote,
}

/// A change observed by a [`CacheManager`](crate::CacheManager).
///
/// Events are raised after the tier chain has been repaired, so a handler
/// that reads the cache sees the post-change state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEvent {
    notification: ChangeNotification,
    origin: EventOrigin,
}

impl CacheEvent {
    pub(crate) fn new(notification: ChangeNotification, origin: EventOrigin) -> Self {
        Self { notification, origin }
    }

    /// Returns the kind of change.
    #[must_use]
    pub fn kind(&self) -> ChangeAction {
        self.notification.action()
    }

    /// Returns the changed key, or `None` for clears.
    #[must_use]
    pub fn key(&self) -> Option<&CacheKey> {
        self.notification.key()
    }

    /// Returns the affected region, if any.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.notification.region()
    }

    /// Returns where the change originated.
    #[must_use]
    pub fn origin(&self) -> EventOrigin {
        self.origin
    }

    /// Returns the change as a backplane notification.
    #[must_use]
    pub fn notification(&self) -> &ChangeNotification {
        &self.notification
    }
}

/// Identifies a registered event handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Synchronous fan-out of events to registered handlers.
#[derive(Default)]
pub(crate) struct EventHub {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, Handler)>>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub").field("handlers", &self.handlers.read().len()).finish()
    }
}

impl EventHub {
    pub(crate) fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Invokes every handler in registration order.
    ///
    /// Handlers run without the registry lock held, so they may subscribe or
    /// unsubscribe themselves.
    pub(crate) fn raise(&self, event: &CacheEvent) {
        let handlers: Vec<Handler> = self.handlers.read().iter().map(|(_, h)| Arc::clone(h)).collect();
        for handler in handlers {
            handler(event);
        }
    }
}
