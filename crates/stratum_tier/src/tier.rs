// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache layers.
//!
//! [`CacheTier`] defines the interface every layer of a tier chain implements.
//! The orchestrator in `stratum` composes an ordered list of tiers and keeps
//! them consistent; a tier only has to be correct about its own contents.

use crate::{CacheItem, CacheKey, Result, UpdateOutcome};

/// An update function applied to the current value of an item.
///
/// Returning `None` declines the update; the tier then reports
/// [`UpdateOutcome::FactoryProducedNothing`].
pub type UpdateFn<'a, V> = dyn Fn(&V) -> Option<V> + Send + Sync + 'a;

/// Trait for cache tier implementations.
///
/// All operations are required except `len`, which defaults to `None` since
/// not every tier tracks its size.
///
/// # Conditional updates
///
/// [`update`](CacheTier::update) must read the current item, apply the update
/// function and persist the result only if the item did not change in the
/// meantime, retrying at most `max_retries` times after the first attempt.
/// Other readers must never observe a partially applied update.
#[cfg_attr(
    feature = "dynamic-tier",
    dynosaur::dynosaur(pub(crate) DynCacheTier = dyn(box) CacheTier, bridge(none))
)]
pub trait CacheTier<V>: Send + Sync {
    /// Human-readable name, used for diagnostics only.
    fn name(&self) -> &str;

    /// Gets an item, or `None` if it is absent or expired.
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Option<CacheItem<V>>>> + Send;

    /// Adds an item if its key is not present yet.
    ///
    /// Returns `false` if the key was already present.
    fn add(&self, item: CacheItem<V>) -> impl Future<Output = Result<bool>> + Send;

    /// Inserts or replaces an item.
    fn put(&self, item: CacheItem<V>) -> impl Future<Output = Result<()>> + Send;

    /// Removes an item. Returns `true` if an item was removed.
    fn remove(&self, key: &CacheKey) -> impl Future<Output = Result<bool>> + Send;

    /// Conditionally updates an item, see the trait documentation.
    fn update(
        &self,
        key: &CacheKey,
        update: &UpdateFn<'_, V>,
        max_retries: u32,
    ) -> impl Future<Output = Result<UpdateOutcome<V>>> + Send;

    /// Removes every item.
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;

    /// Removes every item of `region`.
    fn clear_region(&self, region: &str) -> impl Future<Output = Result<()>> + Send;

    /// Returns the number of items, if supported.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the tier holds no items, if supported.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}
