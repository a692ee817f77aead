// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for cache managers.

use std::sync::Arc;

use parking_lot::Mutex;
use stratum_backplane::{Backplane, DynamicBackplane, DynamicBackplaneExt};
use stratum_tier::{CacheTier, DynamicTier, DynamicTierExt, Error, Result};
use tick::Clock;

use crate::{
    CacheManager, TelemetryConfig,
    chain::TierChain,
    events::EventHub,
    manager::ManagerInner,
    options::{CacheName, ManagerOptions},
};

/// Builder for a [`CacheManager`].
///
/// Created by [`CacheManager::builder`]. Tiers are appended in call order:
/// the first tier added gets index 0 and is read first, the last one is the
/// most authoritative tier that decides adds and updates.
///
/// # Examples
///
/// ```
/// use stratum::{CacheManager, InMemoryTier, TelemetryConfig};
/// use tick::Clock;
///
/// let clock = Clock::new_frozen();
/// let cache = CacheManager::<String>::builder(clock.clone())
///     .tier(InMemoryTier::builder(clock.clone()).name("local").max_capacity(10_000).build())
///     .tier(InMemoryTier::builder(clock).name("shared").build())
///     .name("profiles")
///     .max_retries(20)
///     .telemetry(TelemetryConfig::new().with_logs())
///     .build()?;
///
/// assert_eq!(cache.tier_count(), 2);
/// # Ok::<(), stratum::Error>(())
/// ```
pub struct CacheManagerBuilder<V> {
    clock: Clock,
    tiers: Vec<DynamicTier<V>>,
    options: ManagerOptions,
    backplane: Option<DynamicBackplane>,
    telemetry: TelemetryConfig,
}

impl<V: Send> std::fmt::Debug for CacheManagerBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManagerBuilder")
            .field("tiers", &self.tiers)
            .field("options", &self.options)
            .field("backplane", &self.backplane.is_some())
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl<V> CacheManagerBuilder<V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            tiers: Vec::new(),
            options: ManagerOptions::default(),
            backplane: None,
            telemetry: TelemetryConfig::new(),
        }
    }

    /// Appends a tier to the end of the chain.
    #[must_use]
    pub fn tier<T>(mut self, tier: T) -> Self
    where
        T: CacheTier<V> + 'static,
    {
        self.tiers.push(tier.into_dynamic());
        self
    }

    /// Appends an in-memory tier using the builder's clock.
    #[cfg(feature = "memory")]
    #[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
    #[must_use]
    pub fn memory(self) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        let tier = stratum_memory::InMemoryTier::new(self.clock.clone());
        self.tier(tier)
    }

    /// Connects the manager to a backplane.
    ///
    /// The subscription is opened by [`build`](Self::build); drive
    /// [`CacheManager::backplane_listener`] to apply remote changes.
    #[must_use]
    pub fn backplane<B>(mut self, backplane: B) -> Self
    where
        B: Backplane + 'static,
    {
        self.backplane = Some(backplane.into_dynamic());
        self
    }

    /// Sets all options at once.
    #[must_use]
    pub fn options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the retry budget, see [`ManagerOptions::with_max_retries`].
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.options = self.options.with_max_retries(max_retries);
        self
    }

    /// Sets the name that identifies the manager in telemetry.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.options = self.options.with_name(name);
        self
    }

    /// Enables telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Returns the builder's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Builds the manager.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// if no tier was added.
    pub fn build(self) -> Result<CacheManager<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        if self.tiers.is_empty() {
            return Err(Error::invalid_argument("a cache manager needs at least one tier"));
        }

        let subscription = self.backplane.as_ref().map(Backplane::subscribe);

        Ok(CacheManager {
            inner: Arc::new(ManagerInner {
                chain: TierChain::new(self.tiers),
                options: self.options,
                clock: self.clock,
                backplane: self.backplane,
                subscription: Mutex::new(subscription),
                events: EventHub::default(),
                telemetry: self.telemetry.build(),
            }),
        })
    }
}
