// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache manager and its single-step operations.

use std::{fmt::Debug, sync::Arc};

use futures::stream::BoxStream;
use parking_lot::Mutex;
use stratum_backplane::{Backplane, ChangeNotification, DynamicBackplane};
use stratum_tier::{CacheItem, CacheKey, CacheTier, DynamicTier, Error, Expiration, Result};
use tick::Clock;

use crate::{
    builder::CacheManagerBuilder,
    chain::TierChain,
    events::{CacheEvent, EventHub, EventOrigin, SubscriptionId},
    options::{CacheName, ManagerOptions},
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry, timed},
};

pub(crate) struct ManagerInner<V> {
    pub(crate) chain: TierChain<V>,
    pub(crate) options: ManagerOptions,
    pub(crate) clock: Clock,
    pub(crate) backplane: Option<DynamicBackplane>,
    pub(crate) subscription: Mutex<Option<BoxStream<'static, ChangeNotification>>>,
    pub(crate) events: EventHub,
    pub(crate) telemetry: Option<CacheTelemetry>,
}

/// One logical cache over an ordered chain of tiers.
///
/// Index 0 is the nearest tier; the last tier is the most authoritative one
/// (typically shared between processes). Reads walk the chain from the front
/// and promote hits into the tiers in front of the hit. Writes are applied to
/// the last tier first and the rest of the chain is repaired afterwards by
/// evicting stale copies or storing the fresh item.
///
/// The manager is cheap to clone; clones share tiers, event handlers and the
/// backplane connection.
///
/// # Examples
///
/// ```
/// use stratum::{CacheItem, CacheManager};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let cache = CacheManager::<String>::builder(Clock::new_frozen())
///     .memory()
///     .memory()
///     .build()?;
///
/// cache.put(CacheItem::new("greeting", "hello".to_owned())).await?;
/// assert_eq!(cache.get_value("greeting").await?.as_deref(), Some("hello"));
/// # Ok::<(), stratum::Error>(())
/// # });
/// ```
pub struct CacheManager<V> {
    pub(crate) inner: Arc<ManagerInner<V>>,
}

impl<V> Clone for CacheManager<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Send> Debug for CacheManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("name", &self.inner.options.name())
            .field("tiers", &self.inner.chain)
            .field("backplane", &self.inner.backplane.is_some())
            .finish_non_exhaustive()
    }
}

impl<V> CacheManager<V> {
    /// Creates a builder for a manager whose tiers and timing use `clock`.
    #[must_use]
    pub fn builder(clock: Clock) -> CacheManagerBuilder<V> {
        CacheManagerBuilder::new(clock)
    }

    /// Returns the telemetry name of this manager.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.inner.options.name()
    }

    /// Returns the options this manager was built with.
    #[must_use]
    pub fn options(&self) -> ManagerOptions {
        self.inner.options
    }

    /// Returns the clock used for timing operations.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Registers a handler invoked after every local or remote change.
    ///
    /// Handlers run synchronously on the task that completed the change, after
    /// the tier chain has been repaired and before the backplane is notified.
    pub fn on_event<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    /// Removes a handler. Returns `false` if it was not registered.
    pub fn remove_event_handler(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the number of tiers.
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.inner.chain.len()
    }

    /// Returns the tiers in chain order.
    #[must_use]
    pub fn tiers(&self) -> &[DynamicTier<V>] {
        self.inner.chain.tiers()
    }

    /// Gets an item, reading through the chain.
    ///
    /// A hit at tier `i` is copied into every tier in front of `i` that does
    /// not hold the key yet.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn get(&self, key: impl Into<CacheKey>) -> Result<Option<CacheItem<V>>> {
        let key = validate(key.into())?;
        self.observe(CacheOperation::Get, self.get_item(&key), |found| {
            if found.is_some() {
                CacheActivity::Hit
            } else {
                CacheActivity::Miss
            }
        })
        .await
    }

    /// Gets the value of an item, reading through the chain.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_value(&self, key: impl Into<CacheKey>) -> Result<Option<V>> {
        Ok(self.get(key).await?.map(CacheItem::into_value))
    }

    /// Returns `true` if any tier holds the key.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn exists(&self, key: impl Into<CacheKey>) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Adds an item if its key is not present yet.
    ///
    /// The add is decided by the last tier. When it rejects the item, every
    /// other tier is evicted so that the next read fetches the existing
    /// value; otherwise the item is stored in every other tier.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn add(&self, item: CacheItem<V>) -> Result<bool> {
        validate_item(&item)?;
        self.observe(CacheOperation::Add, self.add_item(&item), |added| {
            if *added {
                CacheActivity::Added
            } else {
                CacheActivity::AddRejected
            }
        })
        .await
    }

    /// Inserts or replaces an item in every tier.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn put(&self, item: CacheItem<V>) -> Result<()> {
        validate_item(&item)?;
        self.observe(CacheOperation::Put, self.put_item(item), |()| CacheActivity::Stored).await
    }

    /// Removes an item from every tier. Returns `true` if any tier held it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn remove(&self, key: impl Into<CacheKey>) -> Result<bool> {
        let key = validate(key.into())?;
        let work = async {
            let removed = self.inner.chain.remove_all(&key).await?;
            if removed {
                self.notify(ChangeNotification::Remove(key.clone())).await;
            }
            Ok(removed)
        };
        self.observe(CacheOperation::Remove, work, |removed| {
            if *removed {
                CacheActivity::Removed
            } else {
                CacheActivity::Miss
            }
        })
        .await
    }

    /// Removes every item from every tier.
    ///
    /// # Errors
    ///
    /// Returns the error of a failing tier.
    pub async fn clear(&self) -> Result<()> {
        let work = async {
            self.inner.chain.clear_all().await?;
            self.notify(ChangeNotification::Clear).await;
            Ok(())
        };
        self.observe(CacheOperation::Clear, work, |()| CacheActivity::Cleared).await
    }

    /// Removes every item of `region` from every tier.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank region, or the error of a failing tier.
    pub async fn clear_region(&self, region: &str) -> Result<()> {
        if region.trim().is_empty() {
            return Err(Error::invalid_argument("region must not be blank"));
        }
        let work = async {
            self.inner.chain.clear_region_all(region).await?;
            self.notify(ChangeNotification::ClearRegion(region.to_owned())).await;
            Ok(())
        };
        self.observe(CacheOperation::ClearRegion, work, |()| CacheActivity::Cleared).await
    }

    /// Stores an existing item again with a new expiration.
    ///
    /// Absolute and sliding timeouts start counting at the time of the call.
    /// Returns `false` and changes nothing if the item does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn expire(&self, key: impl Into<CacheKey>, expiration: Expiration) -> Result<bool> {
        let key = validate(key.into())?;
        let work = async {
            let Some(mut item) = self.get_item(&key).await? else {
                return Ok(false);
            };
            let now = self.inner.clock.system_time();
            item.set_expiration(expiration);
            item.set_created_at(now);
            item.set_last_accessed(now);
            self.put_item(item).await?;
            Ok(true)
        };
        self.observe(CacheOperation::Expire, work, |changed| {
            if *changed {
                CacheActivity::Stored
            } else {
                CacheActivity::Miss
            }
        })
        .await
    }

    /// Makes an existing item never expire.
    ///
    /// Returns `false` if the item does not exist.
    ///
    /// # Errors
    ///
    /// See [`expire`](Self::expire).
    pub async fn remove_expiration(&self, key: impl Into<CacheKey>) -> Result<bool> {
        self.expire(key, Expiration::Never).await
    }

    pub(crate) async fn get_item(&self, key: &CacheKey) -> Result<Option<CacheItem<V>>> {
        let Some((index, item)) = self.inner.chain.find(key).await? else {
            return Ok(None);
        };
        if index > 0 {
            self.inner.chain.promote_above(index, &item).await?;
            self.record_activity(CacheOperation::Get, CacheActivity::Promoted);
        }
        Ok(Some(item))
    }

    pub(crate) async fn add_item(&self, item: &CacheItem<V>) -> Result<bool> {
        let chain = &self.inner.chain;
        let last = chain.last_index();

        if !chain.tier(last).add(item.clone()).await? {
            chain.evict_others(last, item.key()).await?;
            return Ok(false);
        }

        chain.put_above(last, item).await?;
        self.notify(ChangeNotification::Add(item.key().clone())).await;
        Ok(true)
    }

    async fn put_item(&self, item: CacheItem<V>) -> Result<()> {
        self.inner.chain.put_all(&item).await?;
        self.notify(ChangeNotification::Put(item.key().clone())).await;
        Ok(())
    }

    /// Raises the local event, then publishes to the backplane.
    ///
    /// Publishing is best-effort: a failure is logged and does not fail the
    /// operation that already changed the tiers.
    pub(crate) async fn notify(&self, notification: ChangeNotification) {
        self.inner.events.raise(&CacheEvent::new(notification.clone(), EventOrigin::Local));

        if let Some(backplane) = &self.inner.backplane
            && let Err(error) = backplane.publish(notification.clone()).await
        {
            tracing::warn!(
                cache.name = self.name(),
                notification = %notification,
                error = %error,
                "backplane publish failed"
            );
        }
    }

    /// Times `work` and records it with the activity derived from its result.
    pub(crate) async fn observe<T>(
        &self,
        operation: CacheOperation,
        work: impl Future<Output = Result<T>>,
        activity: impl FnOnce(&T) -> CacheActivity,
    ) -> Result<T> {
        let (result, elapsed) = timed(&self.inner.clock, work).await;
        if let Some(telemetry) = &self.inner.telemetry {
            let activity = result.as_ref().map_or(CacheActivity::Error, activity);
            telemetry.record(self.name(), operation, activity, Some(elapsed));
        }
        result
    }

    /// Records an intermediate activity, such as a promotion or eviction.
    pub(crate) fn record_activity(&self, operation: CacheOperation, activity: CacheActivity) {
        if let Some(telemetry) = &self.inner.telemetry {
            telemetry.record(self.name(), operation, activity, None);
        }
    }
}

/// Rejects blank keys before any tier is touched.
pub(crate) fn validate(key: CacheKey) -> Result<CacheKey> {
    if key.is_blank() {
        return Err(Error::invalid_argument("key must not be blank"));
    }
    Ok(key)
}

pub(crate) fn validate_item<V>(item: &CacheItem<V>) -> Result<()> {
    if item.key().is_blank() {
        return Err(Error::invalid_argument("key of the item must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use stratum_tier::{
        ErrorKind,
        testing::{MockTier, TierOp},
    };

    use super::*;
    use crate::{
        TelemetryConfig,
        telemetry::testing::{CapturedLogs, MetricSink},
    };

    fn manager(tiers: &[MockTier<String>]) -> CacheManager<String> {
        tiers
            .iter()
            .fold(CacheManager::builder(Clock::new_frozen()), |builder, tier| builder.tier(tier.clone()))
            .build()
            .unwrap()
    }

    #[test]
    fn blank_key_is_rejected_before_tier_io() {
        let tier = MockTier::new("t0");
        let cache = manager(&[tier.clone()]);

        let error = block_on(cache.get("  ")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        let error = block_on(cache.put(CacheItem::new("", "v".to_owned()))).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        let error = block_on(cache.clear_region(" ")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);

        assert!(tier.operations().is_empty());
    }

    #[test]
    fn rejected_add_evicts_other_tiers() {
        let front = MockTier::new("front");
        let back = MockTier::with_items("back", [CacheItem::new("k", "existing".to_owned())]);
        block_on(front.put(CacheItem::new("k", "stale".to_owned()))).unwrap();
        let cache = manager(&[front.clone(), back.clone()]);

        assert!(!block_on(cache.add(CacheItem::new("k", "new".to_owned()))).unwrap());

        assert!(!front.contains_key(&CacheKey::new("k")));
        assert_eq!(back.peek(&CacheKey::new("k")).unwrap().value(), "existing");
    }

    #[test]
    fn accepted_add_fills_every_tier() {
        let front = MockTier::new("front");
        let back = MockTier::new("back");
        let cache = manager(&[front.clone(), back.clone()]);

        assert!(block_on(cache.add(CacheItem::new("k", "v".to_owned()))).unwrap());

        assert_eq!(front.peek(&CacheKey::new("k")).unwrap().value(), "v");
        assert_eq!(back.peek(&CacheKey::new("k")).unwrap().value(), "v");
        assert_eq!(back.operations()[0], TierOp::Add(CacheItem::new("k", "v".to_owned())));
    }

    #[test]
    fn operations_are_logged_when_enabled() {
        let (logs, _guard) = CapturedLogs::install();
        let front = MockTier::new("front");
        let back = MockTier::with_items("back", [CacheItem::new("k", "v".to_owned())]);
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(front)
            .tier(back)
            .name("profiles")
            .telemetry(TelemetryConfig::new().with_logs())
            .build()
            .unwrap();

        block_on(cache.get("k")).unwrap();
        block_on(cache.get("missing")).unwrap();

        let text = logs.text();
        assert!(text.contains("profiles"), "{text}");
        assert!(text.contains("cache.promoted"), "{text}");
        assert!(text.contains("cache.hit"), "{text}");
        assert!(text.contains("cache.miss"), "{text}");
    }

    #[test]
    fn failed_operation_is_counted_as_error() {
        let sink = MetricSink::new();
        let tier = MockTier::<String>::new("t0");
        tier.fail_when(|op| matches!(op, TierOp::Remove(_)));
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(tier)
            .telemetry(TelemetryConfig::new().with_metrics(sink.provider()))
            .build()
            .unwrap();

        block_on(cache.remove("k")).unwrap_err();

        let error = opentelemetry::KeyValue::new("cache.activity", "cache.error");
        assert!(sink.points().iter().any(|(_, attributes)| attributes.contains(&error)));
    }

    #[test]
    fn eviction_is_recorded_only_when_front_tiers_exist() {
        let logged = |tiers: usize| {
            let (logs, _guard) = CapturedLogs::install();
            let mut builder = CacheManager::builder(Clock::new_frozen()).telemetry(TelemetryConfig::new().with_logs());
            for index in 0..tiers {
                builder = builder.tier(MockTier::with_items(&format!("t{index}"), [CacheItem::new("k", 1_u32)]));
            }
            let cache = builder.build().unwrap();
            assert_eq!(block_on(cache.update("k", |value: &u32| Some(value + 1))).unwrap(), 2);
            logs.text()
        };

        let single = logged(1);
        assert!(single.contains("cache.updated"), "{single}");
        assert!(!single.contains("cache.evicted"), "{single}");

        let two = logged(2);
        assert!(two.contains("cache.evicted"), "{two}");
    }

    #[test]
    fn tier_error_fails_the_operation() {
        let tier = MockTier::new("t0");
        tier.fail_when(|op| matches!(op, TierOp::Put(_)));
        let cache = manager(&[tier]);

        let error = block_on(cache.put(CacheItem::new("k", "v".to_owned()))).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Tier);
    }
}
