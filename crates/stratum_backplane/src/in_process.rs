// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A backplane connecting participants inside one process.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use futures::{StreamExt, stream::BoxStream};
use stratum_tier::Result;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{Backplane, ChangeNotification};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
struct Envelope {
    origin: u64,
    notification: ChangeNotification,
}

/// An in-process backplane built on a `tokio::sync::broadcast` channel.
///
/// Every value returned by [`connect`](Self::connect) is one participant on the
/// same channel. A participant's subscription yields what the other
/// participants publish, never its own notifications.
///
/// A subscriber that falls more than the channel capacity behind cannot know
/// which keys it missed; it receives a single [`ChangeNotification::Clear`]
/// in place of the dropped notifications.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use stratum_backplane::{Backplane, ChangeNotification, InProcessBackplane};
/// use stratum_tier::CacheKey;
///
/// # futures::executor::block_on(async {
/// let first = InProcessBackplane::new();
/// let second = first.connect();
///
/// let mut changes = second.subscribe();
/// first.publish(ChangeNotification::Remove(CacheKey::new("k"))).await?;
///
/// assert_eq!(changes.next().await, Some(ChangeNotification::Remove(CacheKey::new("k"))));
/// # Ok::<(), stratum_tier::Error>(())
/// # });
/// ```
#[derive(Debug)]
pub struct InProcessBackplane {
    origin: u64,
    sender: broadcast::Sender<Envelope>,
    origins: Arc<AtomicU64>,
}

impl Default for InProcessBackplane {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessBackplane {
    /// Creates a channel with the default capacity and returns its first participant.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a channel that buffers up to `capacity` notifications per subscriber.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            origin: 0,
            sender,
            origins: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Returns a new participant on the same channel.
    #[must_use]
    pub fn connect(&self) -> Self {
        Self {
            origin: self.origins.fetch_add(1, Ordering::Relaxed),
            sender: self.sender.clone(),
            origins: Arc::clone(&self.origins),
        }
    }
}

impl Backplane for InProcessBackplane {
    async fn publish(&self, notification: ChangeNotification) -> Result<()> {
        let envelope = Envelope {
            origin: self.origin,
            notification,
        };

        // Sending only fails when nobody is subscribed, which is not an error here.
        if let Err(broadcast::error::SendError(envelope)) = self.sender.send(envelope) {
            tracing::trace!(notification = %envelope.notification, "no backplane subscribers");
        }
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, ChangeNotification> {
        let origin = self.origin;

        futures::stream::unfold(self.sender.subscribe(), move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) if envelope.origin == origin => {}
                    Ok(envelope) => return Some((envelope.notification, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "backplane subscriber lagged, substituting a full clear");
                        return Some((ChangeNotification::Clear, receiver));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use stratum_tier::CacheKey;

    use super::*;

    #[test]
    fn connect_assigns_distinct_origins() {
        let first = InProcessBackplane::new();
        let second = first.connect();
        let third = second.connect();

        assert_ne!(first.origin, second.origin);
        assert_ne!(second.origin, third.origin);
        assert_ne!(first.origin, third.origin);
    }

    #[test]
    fn publish_without_subscribers_succeeds() {
        let backplane = InProcessBackplane::with_capacity(0);
        block_on(backplane.publish(ChangeNotification::Clear)).unwrap();
    }

    #[test]
    fn lagging_subscriber_receives_clear() {
        block_on(async {
            let publisher = InProcessBackplane::with_capacity(2);
            let subscriber = publisher.connect();
            let mut changes = subscriber.subscribe();

            for key in ["a", "b", "c", "d"] {
                publisher.publish(ChangeNotification::Put(CacheKey::new(key))).await.unwrap();
            }

            assert_eq!(changes.next().await, Some(ChangeNotification::Clear));
            assert_eq!(changes.next().await, Some(ChangeNotification::Put(CacheKey::new("c"))));
            assert_eq!(changes.next().await, Some(ChangeNotification::Put(CacheKey::new("d"))));
        });
    }
}
