// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic tier wrapper for type erasure.

use std::{fmt::Debug, sync::Arc};

use crate::{CacheItem, CacheKey, CacheTier, Result, UpdateFn, UpdateOutcome, tier::DynCacheTier};

/// Extension trait for converting any `CacheTier` into a `DynamicTier`.
///
/// This trait is automatically implemented for all types that implement `CacheTier`.
///
/// # Examples
///
/// ```
/// use stratum_tier::{CacheTier, DynamicTier, DynamicTierExt};
///
/// fn erase<T>(tier: T) -> DynamicTier<i32>
/// where
///     T: CacheTier<i32> + 'static,
/// {
///     tier.into_dynamic()
/// }
/// ```
pub trait DynamicTierExt<V>: Sized {
    /// Converts this tier into a `DynamicTier`.
    fn into_dynamic(self) -> DynamicTier<V>;
}

impl<V, T> DynamicTierExt<V> for T
where
    T: CacheTier<V> + 'static,
{
    fn into_dynamic(self) -> DynamicTier<V> {
        DynamicTier::new(self)
    }
}

/// A clonable, type-erased cache tier.
///
/// Tier chains mix heterogeneous storage (an in-process map in front of a
/// shared store, for example); `DynamicTier` lets them live in one ordered list.
pub struct DynamicTier<V>(Arc<DynCacheTier<'static, V>>);

impl<V> DynamicTier<V> {
    pub(crate) fn new<T>(tier: T) -> Self
    where
        T: CacheTier<V> + 'static,
    {
        Self(DynCacheTier::new_arc(tier))
    }
}

impl<V> Debug for DynamicTier<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTier").field("name", &self.0.name()).finish()
    }
}

impl<V> Clone for DynamicTier<V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<V> CacheTier<V> for DynamicTier<V>
where
    V: Send,
{
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem<V>>> {
        self.0.get(key).await
    }

    async fn add(&self, item: CacheItem<V>) -> Result<bool> {
        self.0.add(item).await
    }

    async fn put(&self, item: CacheItem<V>) -> Result<()> {
        self.0.put(item).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        self.0.remove(key).await
    }

    async fn update(&self, key: &CacheKey, update: &UpdateFn<'_, V>, max_retries: u32) -> Result<UpdateOutcome<V>> {
        self.0.update(key, update, max_retries).await
    }

    async fn clear(&self) -> Result<()> {
        self.0.clear().await
    }

    async fn clear_region(&self, region: &str) -> Result<()> {
        self.0.clear_region(region).await
    }

    fn len(&self) -> Option<u64> {
        self.0.len()
    }

    fn is_empty(&self) -> Option<bool> {
        self.0.is_empty()
    }
}
