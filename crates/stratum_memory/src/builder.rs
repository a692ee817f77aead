// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory tiers.
//!
//! This module provides a builder API for `InMemoryTier` that abstracts
//! the underlying moka configuration, so moka types never appear in the
//! public API.

use std::marker::PhantomData;

use stratum_tier::Expiration;
use tick::Clock;

use crate::tier::InMemoryTier;

const DEFAULT_NAME: &str = "memory";

/// Builder for configuring an `InMemoryTier`.
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
///     .initial_capacity(100)
///     .default_expiration(Expiration::Absolute(Duration::from_secs(300)))
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryTierBuilder<V> {
    pub(crate) clock: Clock,
    pub(crate) name: String,
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) default_expiration: Expiration,
    _phantom: PhantomData<V>,
}

impl<V> InMemoryTierBuilder<V> {
    /// Creates a new builder with default settings.
    ///
    /// The default configuration creates an unbounded tier named `"memory"`
    /// whose items never expire unless they carry their own expiration.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            name: DEFAULT_NAME.to_owned(),
            max_capacity: None,
            initial_capacity: None,
            default_expiration: Expiration::Never,
            _phantom: PhantomData,
        }
    }

    /// Sets the tier name used in diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of items.
    ///
    /// Once the capacity is reached, items are evicted using the `TinyLFU`
    /// policy. If not set, the tier is unbounded.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the initial capacity to pre-allocate.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets the expiration applied to items stored with [`Expiration::Inherit`].
    #[must_use]
    pub fn default_expiration(mut self, expiration: Expiration) -> Self {
        self.default_expiration = expiration;
        self
    }
}

impl<V> InMemoryTierBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Builds the configured tier.
    #[must_use]
    pub fn build(self) -> InMemoryTier<V> {
        InMemoryTier::from_builder(self)
    }
}
