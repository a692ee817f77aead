// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The ordered tier chain and its propagation primitives.
//!
//! Index 0 is the nearest tier. A tier with a lower index than another is
//! "above" it; a tier with a higher index is "below" it. Primitives that touch
//! several tiers run their I/O concurrently and fail with the first error.

use std::sync::Arc;

use futures::future::try_join_all;
use stratum_tier::{CacheItem, CacheKey, CacheTier, DynamicTier, Result};

/// An immutable, ordered list of tiers.
pub(crate) struct TierChain<V> {
    tiers: Arc<[DynamicTier<V>]>,
}

impl<V> Clone for TierChain<V> {
    fn clone(&self) -> Self {
        Self {
            tiers: Arc::clone(&self.tiers),
        }
    }
}

impl<V: Send> std::fmt::Debug for TierChain<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tiers.iter().map(CacheTier::name)).finish()
    }
}

impl<V> TierChain<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(tiers: Vec<DynamicTier<V>>) -> Self {
        Self { tiers: tiers.into() }
    }

    pub(crate) fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Index of the most authoritative tier.
    pub(crate) fn last_index(&self) -> usize {
        self.tiers.len().saturating_sub(1)
    }

    pub(crate) fn tier(&self, index: usize) -> &DynamicTier<V> {
        &self.tiers[index]
    }

    pub(crate) fn tiers(&self) -> &[DynamicTier<V>] {
        &self.tiers
    }

    /// Reads through the chain from index 0 and returns the first hit with its index.
    pub(crate) async fn find(&self, key: &CacheKey) -> Result<Option<(usize, CacheItem<V>)>> {
        for (index, tier) in self.tiers.iter().enumerate() {
            if let Some(item) = tier.get(key).await? {
                return Ok(Some((index, item)));
            }
        }
        Ok(None)
    }

    /// Removes `key` from every tier above `index`.
    pub(crate) async fn evict_above(&self, index: usize, key: &CacheKey) -> Result<()> {
        try_join_all(self.tiers[..index.min(self.len())].iter().map(|tier| tier.remove(key))).await?;
        Ok(())
    }

    /// Stores `item` in every tier below `index`.
    pub(crate) async fn push_below(&self, index: usize, item: &CacheItem<V>) -> Result<()> {
        let below = self.tiers.get(index + 1..).unwrap_or_default();
        try_join_all(below.iter().map(|tier| tier.put(item.clone()))).await?;
        Ok(())
    }

    /// Removes `key` from every tier except `index`.
    pub(crate) async fn evict_others(&self, index: usize, key: &CacheKey) -> Result<()> {
        try_join_all(
            self.tiers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, tier)| tier.remove(key)),
        )
        .await?;
        Ok(())
    }

    /// Stores `item` in every tier above `index`.
    pub(crate) async fn put_above(&self, index: usize, item: &CacheItem<V>) -> Result<()> {
        try_join_all(self.tiers[..index.min(self.len())].iter().map(|tier| tier.put(item.clone()))).await?;
        Ok(())
    }

    /// Copies `item` into every tier above `index` that does not hold the key yet.
    ///
    /// Uses `add` so that a value written concurrently by another caller wins
    /// over the promoted copy.
    pub(crate) async fn promote_above(&self, index: usize, item: &CacheItem<V>) -> Result<()> {
        try_join_all(self.tiers[..index.min(self.len())].iter().map(|tier| tier.add(item.clone()))).await?;
        Ok(())
    }

    /// Stores `item` in every tier.
    pub(crate) async fn put_all(&self, item: &CacheItem<V>) -> Result<()> {
        try_join_all(self.tiers.iter().map(|tier| tier.put(item.clone()))).await?;
        Ok(())
    }

    /// Removes `key` from every tier. Returns `true` if any tier held it.
    pub(crate) async fn remove_all(&self, key: &CacheKey) -> Result<bool> {
        let removed = try_join_all(self.tiers.iter().map(|tier| tier.remove(key))).await?;
        Ok(removed.into_iter().any(|r| r))
    }

    /// Clears every tier.
    pub(crate) async fn clear_all(&self) -> Result<()> {
        self.clear_above(self.len()).await
    }

    /// Clears `region` in every tier.
    pub(crate) async fn clear_region_all(&self, region: &str) -> Result<()> {
        self.clear_region_above(self.len(), region).await
    }

    /// Clears every tier above `index`.
    pub(crate) async fn clear_above(&self, index: usize) -> Result<()> {
        try_join_all(self.tiers[..index.min(self.len())].iter().map(CacheTier::clear)).await?;
        Ok(())
    }

    /// Clears `region` in every tier above `index`.
    pub(crate) async fn clear_region_above(&self, index: usize, region: &str) -> Result<()> {
        try_join_all(self.tiers[..index.min(self.len())].iter().map(|tier| tier.clear_region(region))).await?;
        Ok(())
    }
}
