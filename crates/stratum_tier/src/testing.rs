// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock tier implementation for testing.
//!
//! This module provides `MockTier`, an in-memory tier that records all
//! operations and supports failure injection for testing orchestration paths.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::{CacheItem, CacheKey, CacheTier, Error, Result, UpdateFn, UpdateOutcome};

/// Recorded tier operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOp<V> {
    /// A get was performed with the given key.
    Get(CacheKey),
    /// An add was performed with the given item.
    Add(CacheItem<V>),
    /// A put was performed with the given item.
    Put(CacheItem<V>),
    /// A remove was performed with the given key.
    Remove(CacheKey),
    /// A conditional update was performed with the given key.
    Update(CacheKey),
    /// A clear was performed.
    Clear,
    /// A region clear was performed.
    ClearRegion(String),
}

type FailPredicate<V> = Box<dyn Fn(&TierOp<V>) -> bool + Send + Sync>;

/// A configurable mock tier for testing.
///
/// The tier stores items in a map, records every operation, and can be told to
/// fail operations or to report [`UpdateOutcome::RetriesExhausted`] for every
/// conditional update.
///
/// # Examples
///
/// ```
/// use stratum_tier::{testing::{MockTier, TierOp}, CacheItem, CacheKey, CacheTier};
///
/// # futures::executor::block_on(async {
/// let tier = MockTier::<i32>::new("l1");
///
/// tier.put(CacheItem::new("key", 42)).await.unwrap();
/// let item = tier.get(&CacheKey::new("key")).await.unwrap();
/// assert_eq!(*item.unwrap().value(), 42);
///
/// assert_eq!(tier.operations(), vec![
///     TierOp::Put(CacheItem::new("key", 42)),
///     TierOp::Get(CacheKey::new("key")),
/// ]);
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use stratum_tier::{testing::{MockTier, TierOp}, CacheKey, CacheTier};
///
/// # futures::executor::block_on(async {
/// let tier = MockTier::<i32>::new("l1");
///
/// tier.fail_when(|op| matches!(op, TierOp::Get(k) if k.key() == "forbidden"));
/// assert!(tier.get(&CacheKey::new("forbidden")).await.is_err());
/// assert!(tier.get(&CacheKey::new("allowed")).await.is_ok());
/// # });
/// ```
pub struct MockTier<V> {
    name: Arc<str>,
    data: Arc<Mutex<HashMap<CacheKey, CacheItem<V>>>>,
    operations: Arc<Mutex<Vec<TierOp<V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<V>>>>,
    exhaust_updates: Arc<Mutex<bool>>,
}

impl<V> std::fmt::Debug for MockTier<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("exhaust_updates", &*self.exhaust_updates.lock())
            .finish()
    }
}

impl<V> Clone for MockTier<V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            exhaust_updates: Arc::clone(&self.exhaust_updates),
        }
    }
}

impl<V> MockTier<V> {
    /// Creates a new empty mock tier.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            exhaust_updates: Arc::new(Mutex::new(false)),
        }
    }

    /// Creates a mock tier pre-populated with `items`.
    ///
    /// Seeding is not recorded as an operation.
    #[must_use]
    pub fn with_items(name: &str, items: impl IntoIterator<Item = CacheItem<V>>) -> Self {
        let tier = Self::new(name);
        tier.data
            .lock()
            .extend(items.into_iter().map(|item| (item.key().clone(), item)));
        tier
    }

    /// Returns the number of stored items.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the tier holds the given key.
    #[must_use]
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Makes every conditional update report [`UpdateOutcome::RetriesExhausted`].
    pub fn exhaust_updates(&self, enabled: bool) {
        *self.exhaust_updates.lock() = enabled;
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should
    /// fail with an [`ErrorKind::Tier`](crate::ErrorKind::Tier) error.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }
}

impl<V> MockTier<V>
where
    V: Clone,
{
    /// Returns a clone of the stored item for `key`, without recording an operation.
    #[must_use]
    pub fn peek(&self, key: &CacheKey) -> Option<CacheItem<V>> {
        self.data.lock().get(key).cloned()
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<V>> {
        self.operations.lock().clone()
    }

    fn check(&self, op: TierOp<V>) -> Result<()> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        if fail {
            return Err(Error::tier(format!("mock tier '{}': operation failed", self.name)));
        }
        Ok(())
    }
}

impl<V> CacheTier<V> for MockTier<V>
where
    V: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem<V>>> {
        self.check(TierOp::Get(key.clone()))?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn add(&self, item: CacheItem<V>) -> Result<bool> {
        self.check(TierOp::Add(item.clone()))?;
        let mut data = self.data.lock();
        if data.contains_key(item.key()) {
            return Ok(false);
        }
        data.insert(item.key().clone(), item);
        Ok(true)
    }

    async fn put(&self, item: CacheItem<V>) -> Result<()> {
        self.check(TierOp::Put(item.clone()))?;
        self.data.lock().insert(item.key().clone(), item);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        self.check(TierOp::Remove(key.clone()))?;
        Ok(self.data.lock().remove(key).is_some())
    }

    async fn update(&self, key: &CacheKey, update: &UpdateFn<'_, V>, max_retries: u32) -> Result<UpdateOutcome<V>> {
        self.check(TierOp::Update(key.clone()))?;
        if *self.exhaust_updates.lock() {
            return Ok(UpdateOutcome::RetriesExhausted {
                attempts: max_retries.saturating_add(1),
            });
        }

        let mut data = self.data.lock();
        let Some(current) = data.get(key) else {
            return Ok(UpdateOutcome::ItemAbsent);
        };
        let Some(value) = update(current.value()) else {
            return Ok(UpdateOutcome::FactoryProducedNothing);
        };
        let item = current.with_value(value);
        data.insert(key.clone(), item.clone());
        Ok(UpdateOutcome::Success { item, attempts: 1 })
    }

    async fn clear(&self) -> Result<()> {
        self.check(TierOp::Clear)?;
        self.data.lock().clear();
        Ok(())
    }

    async fn clear_region(&self, region: &str) -> Result<()> {
        self.check(TierOp::ClearRegion(region.to_owned()))?;
        self.data.lock().retain(|key, _| !key.in_region(region));
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}
