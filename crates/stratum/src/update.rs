// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conditional update operations.

use stratum_backplane::ChangeNotification;
use stratum_tier::{CacheItem, CacheKey, CacheTier, Error, Result, UpdateFailure, UpdateFn};

use crate::{
    CacheManager,
    manager::{validate, validate_item},
    state::Transition,
    telemetry::{CacheActivity, CacheOperation},
};

/// The item stored by a successful update, or why nothing was stored.
type Settled<V> = std::result::Result<CacheItem<V>, UpdateFailure>;

/// How an add-or-update loop ended.
#[derive(Debug)]
enum Merge<V> {
    Added(V),
    Updated(V),
    Exhausted { attempts: u32 },
}

impl<V> Merge<V> {
    fn activity(&self) -> CacheActivity {
        match self {
            Self::Added(_) => CacheActivity::Added,
            Self::Updated(_) => CacheActivity::Updated,
            Self::Exhausted { .. } => CacheActivity::Exhausted,
        }
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Updates an existing item with the manager's retry budget.
    ///
    /// See [`update_with_retries`](Self::update_with_retries).
    ///
    /// # Errors
    ///
    /// See [`update_with_retries`](Self::update_with_retries).
    pub async fn update<F>(&self, key: impl Into<CacheKey>, update: F) -> Result<V>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        self.update_with_retries(key, update, self.options().max_retries()).await
    }

    /// Updates an existing item and returns the new value.
    ///
    /// The update runs as a conditional write on the last tier, which retries
    /// at most `max_retries` times when the item changes concurrently. On
    /// success every tier in front of it loses its stale copy, every tier
    /// behind it receives the new item, a local event is raised and the
    /// backplane is notified. When the last tier does not hold the key or
    /// runs out of retries, every other tier is evicted.
    ///
    /// `update` returns `None` to decline the update; nothing changes then.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument) for a blank key.
    /// - [`ErrorKind::InvalidState`](crate::ErrorKind::InvalidState) when the update
    ///   did not succeed; [`Error::update_failure`] names why.
    /// - The error of a failing tier.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum::{CacheItem, CacheManager};
    /// use tick::Clock;
    ///
    /// # futures::executor::block_on(async {
    /// let cache = CacheManager::<u64>::builder(Clock::new_frozen()).memory().build()?;
    /// cache.put(CacheItem::new("counter", 1)).await?;
    ///
    /// let value = cache.update_with_retries("counter", |v| Some(v + 1), 10).await?;
    /// assert_eq!(value, 2);
    /// # Ok::<(), stratum::Error>(())
    /// # });
    /// ```
    pub async fn update_with_retries<F>(&self, key: impl Into<CacheKey>, update: F, max_retries: u32) -> Result<V>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        let key = validate(key.into())?;
        match self.settle(&key, &update, max_retries).await? {
            Ok(item) => Ok(item.into_value()),
            Err(failure) => Err(Error::update_failed(failure, format!("update of '{key}' failed: {failure}"))),
        }
    }

    /// Like [`update`](Self::update), but returns `None` when the update did not succeed.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn try_update<F>(&self, key: impl Into<CacheKey>, update: F) -> Result<Option<V>>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        self.try_update_with_retries(key, update, self.options().max_retries()).await
    }

    /// Like [`update_with_retries`](Self::update_with_retries), but returns
    /// `None` when the update did not succeed.
    ///
    /// # Errors
    ///
    /// See [`try_update`](Self::try_update).
    pub async fn try_update_with_retries<F>(&self, key: impl Into<CacheKey>, update: F, max_retries: u32) -> Result<Option<V>>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        let key = validate(key.into())?;
        Ok(self.settle(&key, &update, max_retries).await?.ok().map(CacheItem::into_value))
    }

    /// Adds `item`, or updates the existing item, with the manager's retry budget.
    ///
    /// # Errors
    ///
    /// See [`add_or_update_with_retries`](Self::add_or_update_with_retries).
    pub async fn add_or_update<F>(&self, item: CacheItem<V>, update: F) -> Result<V>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        self.add_or_update_with_retries(item, update, self.options().max_retries()).await
    }

    /// Adds `item`, or updates the existing item, and returns the stored value.
    ///
    /// Each attempt first tries to [`add`](Self::add) the item; if the key
    /// exists, it tries to update it. An update can fail because the item was
    /// removed in the meantime, so the loop starts over with the add. At most
    /// `max_retries + 1` attempts are made; each update may itself retry
    /// `max_retries` times on the last tier.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument) for a blank key.
    /// - [`ErrorKind::InvalidState`](crate::ErrorKind::InvalidState) when neither the
    ///   add nor the update succeeded within the retry budget.
    /// - The error of a failing tier.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum::{CacheItem, CacheManager};
    /// use tick::Clock;
    ///
    /// # futures::executor::block_on(async {
    /// let cache = CacheManager::<u64>::builder(Clock::new_frozen()).memory().build()?;
    ///
    /// assert_eq!(cache.add_or_update(CacheItem::new("hits", 1), |v| Some(v + 1)).await?, 1);
    /// assert_eq!(cache.add_or_update(CacheItem::new("hits", 1), |v| Some(v + 1)).await?, 2);
    /// # Ok::<(), stratum::Error>(())
    /// # });
    /// ```
    pub async fn add_or_update_with_retries<F>(&self, item: CacheItem<V>, update: F, max_retries: u32) -> Result<V>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        validate_item(&item)?;
        let key = item.key().clone();
        match self.merge(item, &update, max_retries).await? {
            Merge::Added(value) | Merge::Updated(value) => Ok(value),
            Merge::Exhausted { attempts } => Err(Error::invalid_state(format!(
                "could not add nor update the item '{key}' within {attempts} attempts"
            ))),
        }
    }

    /// Like [`add_or_update`](Self::add_or_update), but returns `None` when
    /// the retry budget ran out.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn try_add_or_update<F>(&self, item: CacheItem<V>, update: F) -> Result<Option<V>>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        self.try_add_or_update_with_retries(item, update, self.options().max_retries()).await
    }

    /// Like [`try_add_or_update`](Self::try_add_or_update), with an explicit
    /// retry budget for both the add loop and the conditional update.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// for a blank key, or the error of a failing tier.
    pub async fn try_add_or_update_with_retries<F>(&self, item: CacheItem<V>, update: F, max_retries: u32) -> Result<Option<V>>
    where
        F: Fn(&V) -> Option<V> + Send + Sync,
    {
        validate_item(&item)?;
        Ok(match self.merge(item, &update, max_retries).await? {
            Merge::Added(value) | Merge::Updated(value) => Some(value),
            Merge::Exhausted { .. } => None,
        })
    }

    async fn merge(&self, item: CacheItem<V>, update: &UpdateFn<'_, V>, max_retries: u32) -> Result<Merge<V>> {
        let work = async {
            let attempts = max_retries.saturating_add(1);
            for attempt in 1..=attempts {
                if self.add_item(&item).await? {
                    return Ok(Merge::Added(item.into_value()));
                }
                if let Ok(updated) = self.update_once(item.key(), update, max_retries).await? {
                    return Ok(Merge::Updated(updated.into_value()));
                }
                tracing::debug!(key = %item.key(), attempt, attempts, "add or update: both steps failed, retrying");
            }
            Ok(Merge::Exhausted { attempts })
        };

        self.observe(CacheOperation::AddOrUpdate, work, Merge::activity).await
    }

    /// Runs one conditional update and records it.
    async fn settle(&self, key: &CacheKey, update: &UpdateFn<'_, V>, max_retries: u32) -> Result<Settled<V>> {
        self.observe(CacheOperation::Update, self.update_once(key, update, max_retries), |settled| {
            if settled.is_ok() {
                CacheActivity::Updated
            } else {
                CacheActivity::NotUpdated
            }
        })
        .await
    }

    /// Updates the last tier and repairs the rest of the chain.
    async fn update_once(&self, key: &CacheKey, update: &UpdateFn<'_, V>, max_retries: u32) -> Result<Settled<V>> {
        let chain = &self.inner.chain;
        let index = chain.last_index();
        let tier = chain.tier(index);
        let outcome = tier.update(key, update, max_retries).await?;

        match Transition::from(outcome) {
            Transition::Propagate { item, attempts } => {
                tracing::trace!(key = %key, tier = tier.name(), attempts, "update succeeded");
                chain.evict_above(index, key).await?;
                chain.push_below(index, &item).await?;
                if index > 0 {
                    self.record_activity(CacheOperation::Update, CacheActivity::Evicted);
                }
                self.notify(ChangeNotification::Update(key.clone())).await;
                Ok(Ok(item))
            }
            Transition::EvictOthers(failure) => {
                tracing::warn!(key = %key, tier = tier.name(), reason = %failure, "update failed, evicting other tiers");
                chain.evict_others(index, key).await?;
                self.record_activity(CacheOperation::Update, CacheActivity::Evicted);
                Ok(Err(failure))
            }
            Transition::Abandon(failure) => {
                tracing::warn!(key = %key, tier = tier.name(), reason = %failure, "update failed");
                Ok(Err(failure))
            }
        }
    }
}
