// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory cache tier implementation using moka.
//!
//! Items are stored in slots that carry a version number. A conditional update
//! reads a slot, applies the update function without holding any lock, then
//! swaps the new slot in only if the stored version is still the one it read.

use std::{
    fmt::Debug,
    future::ready,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use moka::{
    future::Cache,
    ops::compute::{CompResult, Op},
};
use parking_lot::Mutex;
use stratum_tier::{CacheItem, CacheKey, CacheTier, Expiration, Result, UpdateFn, UpdateOutcome};
use thread_aware::PerProcess;
use tick::Clock;

use crate::builder::InMemoryTierBuilder;

/// A stored item and the version it was written with.
///
/// The item sits behind a mutex only so that reads can record the access time
/// for sliding expiration.
struct Slot<V> {
    version: u64,
    item: Mutex<CacheItem<V>>,
}

impl<V: Clone> Slot<V> {
    /// Returns a copy of the item and records the access, or `None` if expired.
    fn read(&self, now: SystemTime) -> Option<CacheItem<V>> {
        let mut item = self.item.lock();
        if item.is_expired(now) {
            return None;
        }
        item.set_last_accessed(now);
        Some(item.clone())
    }

    fn is_expired(&self, now: SystemTime) -> bool {
        self.item.lock().is_expired(now)
    }
}

/// An in-memory cache tier backed by moka.
///
/// This tier provides:
/// - Concurrent access with high performance
/// - Optional capacity bound with `TinyLFU` eviction
/// - Regions and per-item absolute or sliding expiration
/// - Lock-free conditional updates with bounded retries
///
/// # Examples
///
/// ```
/// use stratum_memory::InMemoryTier;
/// use stratum_tier::{CacheItem, CacheKey, CacheTier};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let tier = InMemoryTier::<i32>::new(Clock::new_frozen());
///
/// tier.put(CacheItem::new("key", 42)).await?;
/// let item = tier.get(&CacheKey::new("key")).await?;
/// assert_eq!(*item.unwrap().value(), 42);
/// # Ok::<(), stratum_tier::Error>(())
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    name: Arc<str>,
    clock: Clock,
    default_expiration: Expiration,
    versions: Arc<AtomicU64>,
    inner: thread_aware::Arc<Cache<CacheKey, Arc<Slot<V>>>, PerProcess>,
}

impl<V> Debug for InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTier")
            .field("name", &self.name)
            .field("default_expiration", &self.default_expiration)
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl<V> InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new unbounded in-memory tier whose items never expire by default.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum_memory::InMemoryTier;
    /// use tick::Clock;
    ///
    /// let tier = InMemoryTier::<i32>::new(Clock::new_frozen());
    /// ```
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self::builder(clock).build()
    }

    /// Creates a new builder for configuring an in-memory tier.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum_memory::InMemoryTier;
    /// use stratum_tier::Expiration;
    /// use std::time::Duration;
    /// use tick::Clock;
    ///
    /// let tier = InMemoryTier::<i32>::builder(Clock::new_frozen())
    ///     .name("l1")
    ///     .max_capacity(1000)
    ///     .default_expiration(Expiration::Sliding(Duration::from_secs(60)))
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder(clock: Clock) -> InMemoryTierBuilder<V> {
        InMemoryTierBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: InMemoryTierBuilder<V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        moka_builder = moka_builder.name(&builder.name);

        Self {
            name: Arc::from(builder.name),
            clock: builder.clock,
            default_expiration: builder.default_expiration.or(Expiration::Never),
            versions: Arc::new(AtomicU64::new(0)),
            inner: thread_aware::Arc::from_unaware(moka_builder.build()),
        }
    }

    fn now(&self) -> SystemTime {
        self.clock.system_time()
    }

    /// Wraps `item` in a fresh slot, resolving its expiration and timestamps.
    fn slot(&self, mut item: CacheItem<V>, now: SystemTime) -> Arc<Slot<V>> {
        item.set_expiration(item.expiration().or(self.default_expiration));
        if item.created_at().is_none() {
            item.set_created_at(now);
        }
        item.set_last_accessed(now);

        Arc::new(Slot {
            version: self.versions.fetch_add(1, Ordering::Relaxed),
            item: Mutex::new(item),
        })
    }

    /// Returns the live slot for `key`, evicting it first if it has expired.
    async fn live(&self, key: &CacheKey, now: SystemTime) -> Option<(Arc<Slot<V>>, CacheItem<V>)> {
        let slot = self.inner.get(key).await?;
        match slot.read(now) {
            Some(item) => Some((slot, item)),
            None => {
                self.remove_version(key, slot.version).await;
                None
            }
        }
    }

    /// Removes `key` only if it still holds the slot written with `version`.
    async fn remove_version(&self, key: &CacheKey, version: u64) {
        self.inner
            .entry(key.clone())
            .and_compute_with(|current| {
                ready(match current {
                    Some(entry) if entry.value().version == version => Op::Remove,
                    _ => Op::Nop,
                })
            })
            .await;
    }
}

impl<V> CacheTier<V> for InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem<V>>> {
        let now = self.now();
        Ok(self.live(key, now).await.map(|(_, item)| item))
    }

    async fn add(&self, item: CacheItem<V>) -> Result<bool> {
        let now = self.now();
        let key = item.key().clone();
        let slot = self.slot(item, now);

        let result = self
            .inner
            .entry(key)
            .and_compute_with(|current| {
                ready(match current {
                    Some(entry) if !entry.value().is_expired(now) => Op::Nop,
                    _ => Op::Put(slot),
                })
            })
            .await;

        Ok(matches!(result, CompResult::Inserted(_) | CompResult::ReplacedWith(_)))
    }

    async fn put(&self, item: CacheItem<V>) -> Result<()> {
        let now = self.now();
        let key = item.key().clone();
        self.inner.insert(key, self.slot(item, now)).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let now = self.now();
        Ok(self.inner.remove(key).await.is_some_and(|slot| !slot.is_expired(now)))
    }

    async fn update(&self, key: &CacheKey, update: &UpdateFn<'_, V>, max_retries: u32) -> Result<UpdateOutcome<V>> {
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            let now = self.now();

            let Some((current, item)) = self.live(key, now).await else {
                return Ok(UpdateOutcome::ItemAbsent);
            };

            let Some(value) = update(item.value()) else {
                return Ok(UpdateOutcome::FactoryProducedNothing);
            };

            let updated = item.with_value(value);
            let expected = current.version;
            let next = self.slot(updated.clone(), now);

            let result = self
                .inner
                .entry(key.clone())
                .and_compute_with(|stored| {
                    ready(match stored {
                        Some(entry) if entry.value().version == expected => Op::Put(next),
                        _ => Op::Nop,
                    })
                })
                .await;

            if matches!(result, CompResult::ReplacedWith(_)) {
                return Ok(UpdateOutcome::Success { item: updated, attempts });
            }

            if attempts > max_retries {
                return Ok(UpdateOutcome::RetriesExhausted { attempts });
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        self.inner.invalidate_all();
        Ok(())
    }

    async fn clear_region(&self, region: &str) -> Result<()> {
        let keys: Vec<Arc<CacheKey>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.in_region(region))
            .map(|(key, _)| key)
            .collect();

        for key in keys {
            self.inner.invalidate(key.as_ref()).await;
        }
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }
}
