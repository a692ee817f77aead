// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache key identity.

use std::fmt::{Display, Formatter};

/// Identity of a cached item: a key, optionally qualified by a region.
///
/// A missing region and a blank region are equivalent and both denote the
/// default region, so `CacheKey::with_region("k", "")` compares equal to
/// `CacheKey::new("k")`.
///
/// # Examples
///
/// ```
/// use stratum_tier::CacheKey;
///
/// let key = CacheKey::with_region("user:42", "profiles");
/// assert_eq!(key.key(), "user:42");
/// assert_eq!(key.region(), Some("profiles"));
///
/// assert_eq!(CacheKey::with_region("k", " "), CacheKey::new("k"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    key: String,
    region: Option<String>,
}

impl CacheKey {
    /// Creates a key in the default region.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region: None,
        }
    }

    /// Creates a key qualified by `region`.
    ///
    /// A blank region is normalized to the default region.
    pub fn with_region(key: impl Into<String>, region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            key: key.into(),
            region: (!region.trim().is_empty()).then_some(region),
        }
    }

    /// Returns the key without its region.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the region, or `None` for the default region.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Returns `true` if this key belongs to `region`.
    #[must_use]
    pub fn in_region(&self, region: &str) -> bool {
        self.region() == Some(region)
    }

    /// Returns `true` if the key is empty or whitespace only.
    ///
    /// Blank keys are rejected by the orchestrator before any tier is touched.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.key.trim().is_empty()
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{region}:{}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<(&str, &str)> for CacheKey {
    fn from((key, region): (&str, &str)) -> Self {
        Self::with_region(key, region)
    }
}
