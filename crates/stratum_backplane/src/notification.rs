// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Display, Formatter};

use stratum_tier::CacheKey;

/// What changed in a cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// An item was added.
    Add,
    /// An item was inserted or replaced.
    Put,
    /// An item was updated in place.
    Update,
    /// An item was removed.
    Remove,
    /// All items were removed.
    Clear,
    /// All items of a region were removed.
    ClearRegion,
}

impl ChangeAction {
    /// Returns the action name used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Put => "put",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Clear => "clear",
            Self::ClearRegion => "clear_region",
        }
    }
}

impl Display for ChangeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change to a cache, exchanged over a backplane and with local subscribers.
///
/// Notifications are purely informational: nothing waits for them to be
/// acknowledged.
///
/// # Examples
///
/// ```
/// use stratum_backplane::{ChangeAction, ChangeNotification};
/// use stratum_tier::CacheKey;
///
/// let change = ChangeNotification::Update(CacheKey::with_region("k", "r"));
/// assert_eq!(change.action(), ChangeAction::Update);
/// assert_eq!(change.key().map(CacheKey::key), Some("k"));
/// assert_eq!(change.region(), Some("r"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangeNotification {
    /// The key was added.
    Add(CacheKey),
    /// The key was inserted or replaced.
    Put(CacheKey),
    /// The key was updated.
    Update(CacheKey),
    /// The key was removed.
    Remove(CacheKey),
    /// Everything was removed.
    Clear,
    /// Everything in the region was removed.
    ClearRegion(String),
}

impl ChangeNotification {
    /// Returns the kind of change.
    #[must_use]
    pub fn action(&self) -> ChangeAction {
        match self {
            Self::Add(_) => ChangeAction::Add,
            Self::Put(_) => ChangeAction::Put,
            Self::Update(_) => ChangeAction::Update,
            Self::Remove(_) => ChangeAction::Remove,
            Self::Clear => ChangeAction::Clear,
            Self::ClearRegion(_) => ChangeAction::ClearRegion,
        }
    }

    /// Returns the affected key for per-key changes.
    #[must_use]
    pub fn key(&self) -> Option<&CacheKey> {
        match self {
            Self::Add(key) | Self::Put(key) | Self::Update(key) | Self::Remove(key) => Some(key),
            Self::Clear | Self::ClearRegion(_) => None,
        }
    }

    /// Returns the affected region, if the change is scoped to one.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        match self {
            Self::ClearRegion(region) => Some(region),
            Self::Clear => None,
            Self::Add(key) | Self::Put(key) | Self::Update(key) | Self::Remove(key) => key.region(),
        }
    }
}

impl Display for ChangeNotification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear => f.write_str("clear"),
            Self::ClearRegion(region) => write!(f, "clear_region {region}"),
            Self::Add(key) | Self::Put(key) | Self::Update(key) | Self::Remove(key) => {
                write!(f, "{} {key}", self.action())
            }
        }
    }
}
