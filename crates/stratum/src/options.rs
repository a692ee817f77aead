// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Manager configuration.

/// Name used to identify a cache manager in telemetry.
pub type CacheName = &'static str;

/// Default name of a manager that was not given one.
pub const DEFAULT_NAME: CacheName = "stratum";

/// Default retry budget of orchestration loops and tier updates.
pub const DEFAULT_MAX_RETRIES: u32 = 50;

/// Settings shared by every operation of a [`CacheManager`](crate::CacheManager).
///
/// # Examples
///
/// ```
/// use stratum::ManagerOptions;
///
/// let options = ManagerOptions::default().with_max_retries(10).with_name("orders");
/// assert_eq!(options.max_retries(), 10);
/// assert_eq!(options.name(), "orders");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagerOptions {
    max_retries: u32,
    name: CacheName,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            name: DEFAULT_NAME,
        }
    }
}

impl ManagerOptions {
    /// Sets the retry budget.
    ///
    /// Every retry loop makes at most `max_retries + 1` attempts. The budget
    /// should be generous (tens) so that an ordinary insert race always
    /// resolves before the loop gives up.
    #[must_use]
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self { max_retries, ..self }
    }

    /// Sets the telemetry name.
    #[must_use]
    pub fn with_name(self, name: CacheName) -> Self {
        Self { name, ..self }
    }

    /// Returns the retry budget.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the telemetry name.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }
}
