// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Application of changes made by other processes.

use std::sync::{Arc, Weak};

use futures::{FutureExt, StreamExt, future::BoxFuture};
use stratum_backplane::ChangeNotification;
use stratum_tier::Result;

use crate::{
    CacheManager,
    events::{CacheEvent, EventOrigin},
    manager::ManagerInner,
    telemetry::{CacheActivity, CacheOperation},
};

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Takes the future that applies changes published by other processes.
    ///
    /// Another process that changes the shared last tier leaves stale copies
    /// in this process' front tiers. The listener evicts them: per-key
    /// changes remove the key from every tier except the last one, clears
    /// clear those tiers. Each applied change raises an event with
    /// [`EventOrigin::Remote`].
    ///
    /// The listener must be driven by the caller, for example with
    /// `tokio::spawn`. It ends when the backplane subscription closes or the
    /// manager and all its clones are dropped. Returns `None` if no backplane
    /// is configured or the listener was already taken.
    #[must_use]
    pub fn backplane_listener(&self) -> Option<BoxFuture<'static, ()>> {
        let mut changes = self.inner.subscription.lock().take()?;
        let manager: Weak<ManagerInner<V>> = Arc::downgrade(&self.inner);

        Some(
            async move {
                while let Some(notification) = changes.next().await {
                    let Some(inner) = manager.upgrade() else {
                        break;
                    };
                    Self { inner }.apply_remote(notification).await;
                }
                tracing::debug!("backplane listener stopped");
            }
            .boxed(),
        )
    }

    /// Repairs the local tiers after a change made by another process.
    pub(crate) async fn apply_remote(&self, notification: ChangeNotification) {
        let work = self.evict_local(&notification);
        let result = self
            .observe(CacheOperation::RemoteChange, work, |()| match notification {
                ChangeNotification::Clear | ChangeNotification::ClearRegion(_) => CacheActivity::Cleared,
                _ => CacheActivity::Evicted,
            })
            .await;

        match result {
            Ok(()) => self.inner.events.raise(&CacheEvent::new(notification, EventOrigin::Remote)),
            Err(error) => tracing::error!(
                cache.name = self.name(),
                notification = %notification,
                error = %error,
                "failed to apply remote change"
            ),
        }
    }

    async fn evict_local(&self, notification: &ChangeNotification) -> Result<()> {
        let chain = &self.inner.chain;
        let source = chain.last_index();

        match notification {
            ChangeNotification::Add(key)
            | ChangeNotification::Put(key)
            | ChangeNotification::Update(key)
            | ChangeNotification::Remove(key) => chain.evict_above(source, key).await,
            ChangeNotification::Clear => chain.clear_above(source).await,
            ChangeNotification::ClearRegion(region) => chain.clear_region_above(source, region).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use stratum_backplane::ChangeAction;
    use stratum_tier::{
        CacheItem, CacheKey, CacheTier,
        testing::{MockTier, TierOp},
    };
    use tick::Clock;

    use super::*;

    #[test]
    fn key_change_evicts_all_but_last_tier() {
        let front = MockTier::new("front");
        let back = MockTier::new("back");
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(front.clone())
            .tier(back.clone())
            .build()
            .unwrap();
        let events = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        {
            let events = std::sync::Arc::clone(&events);
            cache.on_event(move |event: &CacheEvent| events.lock().push((event.kind(), event.origin())));
        }

        block_on(async {
            for tier in [&front, &back] {
                tier.put(CacheItem::new("k", 1)).await.unwrap();
            }
            cache.apply_remote(ChangeNotification::Update(CacheKey::new("k"))).await;
        });

        assert!(!front.contains_key(&CacheKey::new("k")));
        assert!(back.contains_key(&CacheKey::new("k")));
        assert_eq!(*events.lock(), vec![(ChangeAction::Update, EventOrigin::Remote)]);
    }

    #[test]
    fn clear_region_clears_local_tiers_only() {
        let front = MockTier::<i32>::new("front");
        let back = MockTier::<i32>::new("back");
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(front.clone())
            .tier(back.clone())
            .build()
            .unwrap();

        block_on(cache.apply_remote(ChangeNotification::ClearRegion("r".to_owned())));

        assert_eq!(front.operations(), vec![TierOp::ClearRegion("r".to_owned())]);
        assert!(back.operations().is_empty());
    }

    #[test]
    fn failed_eviction_raises_no_event() {
        let front = MockTier::<i32>::new("front");
        front.fail_when(|op| matches!(op, TierOp::Clear));
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(front)
            .tier(MockTier::new("back"))
            .build()
            .unwrap();
        let raised = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        {
            let raised = std::sync::Arc::clone(&raised);
            cache.on_event(move |_: &CacheEvent| raised.store(true, std::sync::atomic::Ordering::Relaxed));
        }

        block_on(cache.apply_remote(ChangeNotification::Clear));

        assert!(!raised.load(std::sync::atomic::Ordering::Relaxed));
    }

    #[test]
    fn no_listener_without_backplane() {
        let cache = CacheManager::<i32>::builder(Clock::new_frozen())
            .tier(MockTier::new("only"))
            .build()
            .unwrap();
        assert!(cache.backplane_listener().is_none());
    }
}
