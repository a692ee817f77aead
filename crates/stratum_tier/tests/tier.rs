// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `CacheTier` default implementations and `DynamicTier`.

use std::collections::HashMap;
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use stratum_tier::{CacheItem, CacheKey, CacheTier, DynamicTierExt, Result, UpdateFn, UpdateOutcome};

/// Minimal implementation that only provides required methods.
struct MinimalTier<V> {
    data: Mutex<HashMap<CacheKey, CacheItem<V>>>,
}

impl<V> MinimalTier<V> {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> CacheTier<V> for MinimalTier<V>
where
    V: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        "minimal"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem<V>>> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn add(&self, item: CacheItem<V>) -> Result<bool> {
        let mut data = self.data.lock().expect("lock poisoned");
        if data.contains_key(item.key()) {
            return Ok(false);
        }
        data.insert(item.key().clone(), item);
        Ok(true)
    }

    async fn put(&self, item: CacheItem<V>) -> Result<()> {
        self.data.lock().expect("lock poisoned").insert(item.key().clone(), item);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.data.lock().expect("lock poisoned").remove(key).is_some())
    }

    async fn update(&self, key: &CacheKey, update: &UpdateFn<'_, V>, _max_retries: u32) -> Result<UpdateOutcome<V>> {
        let mut data = self.data.lock().expect("lock poisoned");
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
        self.data.lock().expect("lock poisoned").clear();
        Ok(())
    }

    async fn clear_region(&self, region: &str) -> Result<()> {
        self.data.lock().expect("lock poisoned").retain(|key, _| !key.in_region(region));
        Ok(())
    }
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn double(value: &i32) -> Option<i32> {
    Some(value * 2)
}

#[test]
fn default_len_is_unknown() {
    let tier = MinimalTier::<i32>::new();
    assert_eq!(tier.len(), None);
    assert_eq!(tier.is_empty(), None);
}

#[test]
fn dynamic_tier_delegates_every_operation() {
    block_on(async {
        let tier = MinimalTier::new().into_dynamic();
        let key = CacheKey::with_region("k", "r");

        assert_eq!(tier.name(), "minimal");
        assert!(tier.add(CacheItem::new(key.clone(), 21)).await.unwrap());
        assert!(!tier.add(CacheItem::new(key.clone(), 0)).await.unwrap());

        let outcome = tier.update(&key, &double, 0).await.unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Success {
                item: CacheItem::new(key.clone(), 42),
                attempts: 1
            }
        );
        assert_eq!(*tier.get(&key).await.unwrap().unwrap().value(), 42);

        tier.put(CacheItem::new("other", 1)).await.unwrap();
        tier.clear_region("r").await.unwrap();
        assert!(tier.get(&key).await.unwrap().is_none());
        assert!(tier.get(&CacheKey::new("other")).await.unwrap().is_some());

        assert!(tier.remove(&CacheKey::new("other")).await.unwrap());
        assert!(!tier.remove(&CacheKey::new("other")).await.unwrap());

        tier.put(CacheItem::new("again", 1)).await.unwrap();
        tier.clear().await.unwrap();
        assert!(tier.get(&CacheKey::new("again")).await.unwrap().is_none());
        assert_eq!(tier.len(), None);
    });
}

#[test]
fn dynamic_tier_clones_share_storage() {
    block_on(async {
        let tier = MinimalTier::new().into_dynamic();
        let clone = tier.clone();

        tier.put(CacheItem::new("k", 1)).await.unwrap();
        assert!(clone.get(&CacheKey::new("k")).await.unwrap().is_some());
        assert!(format!("{clone:?}").contains("minimal"));
    });
}
