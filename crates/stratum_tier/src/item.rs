// Copyright (c) Microsoft Corporation.

use std::{
    ops::Deref,
    time::{Duration, SystemTime},
};

use crate::CacheKey;

/// How a stored item expires.
///
/// Absolute expiration is measured from the time the item was first stored,
/// sliding expiration from the last time it was read or updated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Expiration {
    /// Use the expiration configured on the tier storing the item.
    #[default]
    Inherit,
    /// Never expires.
    Never,
    /// Expires a fixed duration after the item was stored.
    Absolute(Duration),
    /// Expires once the item has not been accessed for the given duration.
    Sliding(Duration),
}

impl Expiration {
    /// Returns `self`, or `fallback` when `self` is [`Expiration::Inherit`].
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        match self {
            Self::Inherit => fallback,
            other => other,
        }
    }
}

/// A cached value together with its identity and expiration metadata.
///
/// An item always holds a value. Absence is expressed by a tier returning
/// `None`, never by an item carrying an empty value.
///
/// # Examples
///
/// ```
/// use stratum_tier::{CacheItem, Expiration};
/// use std::time::Duration;
///
/// let item = CacheItem::new("key", 42)
///     .with_expiration(Expiration::Sliding(Duration::from_secs(30)));
///
/// assert_eq!(*item.value(), 42);
/// assert_eq!(item.key().key(), "key");
///
/// let next = item.with_value(43);
/// assert_eq!(next.key(), item.key());
/// assert_eq!(next.expiration(), item.expiration());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheItem<V> {
    key: CacheKey,
    value: V,
    expiration: Expiration,
    created_at: Option<SystemTime>,
    last_accessed: Option<SystemTime>,
}

impl<V> CacheItem<V> {
    /// Creates a new item with inherited expiration.
    ///
    /// Timestamps are assigned by the tier that stores the item.
    pub fn new(key: impl Into<CacheKey>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            expiration: Expiration::Inherit,
            created_at: None,
            last_accessed: None,
        }
    }

    /// Returns this item with a different expiration.
    #[must_use]
    pub fn with_expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Creates a copy of this item holding `value`.
    ///
    /// Identity, expiration and timestamps carry over, so an absolute
    /// expiration keeps counting from the original store time.
    #[must_use]
    pub fn with_value(&self, value: V) -> Self {
        Self {
            key: self.key.clone(),
            value,
            expiration: self.expiration,
            created_at: self.created_at,
            last_accessed: self.last_accessed,
        }
    }

    /// Returns the identity of this item.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the item and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the expiration mode.
    #[must_use]
    pub fn expiration(&self) -> Expiration {
        self.expiration
    }

    /// Sets the expiration mode.
    pub fn set_expiration(&mut self, expiration: Expiration) {
        self.expiration = expiration;
    }

    /// Returns when the item was first stored, if it has been stored.
    #[must_use]
    pub fn created_at(&self) -> Option<SystemTime> {
        self.created_at
    }

    /// Sets the store time. Called by tiers when the item is first stored.
    pub fn set_created_at(&mut self, at: SystemTime) {
        self.created_at = Some(at);
    }

    /// Returns when the item was last read or updated.
    #[must_use]
    pub fn last_accessed(&self) -> Option<SystemTime> {
        self.last_accessed
    }

    /// Records an access at `at`.
    pub fn set_last_accessed(&mut self, at: SystemTime) {
        self.last_accessed = Some(at);
    }

    /// Returns `true` if the item has expired at `now`.
    ///
    /// [`Expiration::Inherit`] must be resolved by the tier before calling this;
    /// an unresolved item never expires. Items without timestamps never expire.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        let (since, timeout) = match self.expiration {
            Expiration::Inherit | Expiration::Never => return false,
            Expiration::Absolute(timeout) => (self.created_at, timeout),
            Expiration::Sliding(timeout) => (self.last_accessed.or(self.created_at), timeout),
        };

        since.is_some_and(|since| now.duration_since(since).is_ok_and(|elapsed| elapsed >= timeout))
    }
}

impl<V> Deref for CacheItem<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
