// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry for cache manager operations.
//!
//! Operations emit structured `tracing` events and, with the `metrics`
//! feature, OpenTelemetry counters and histograms. Both are opt-in through
//! [`TelemetryConfig`].

use thread_aware::{Arc, PerCore};
use tracing::Level;

mod config;
#[cfg(any(feature = "metrics", test))]
mod instruments;
mod recorder;
#[cfg(test)]
pub(crate) mod testing;
mod timing;

pub use config::TelemetryConfig;
pub(crate) use timing::timed;

/// Records manager operations as logs and metrics.
#[derive(Clone, Debug)]
pub(crate) struct CacheTelemetry {
    recorder: Arc<recorder::Recorder, PerCore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Add,
    Put,
    Remove,
    Update,
    GetOrAdd,
    AddOrUpdate,
    Expire,
    Clear,
    ClearRegion,
    RemoteChange,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Add => "cache.add",
            Self::Put => "cache.put",
            Self::Remove => "cache.remove",
            Self::Update => "cache.update",
            Self::GetOrAdd => "cache.get_or_add",
            Self::AddOrUpdate => "cache.add_or_update",
            Self::Expire => "cache.expire",
            Self::Clear => "cache.clear",
            Self::ClearRegion => "cache.clear_region",
            Self::RemoteChange => "cache.remote_change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Promoted,
    Added,
    AddRejected,
    Stored,
    Updated,
    NotUpdated,
    Exhausted,
    Removed,
    Evicted,
    Cleared,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Promoted => "cache.promoted",
            Self::Added => "cache.added",
            Self::AddRejected => "cache.add_rejected",
            Self::Stored => "cache.stored",
            Self::Updated => "cache.updated",
            Self::NotUpdated => "cache.not_updated",
            Self::Exhausted => "cache.retries_exhausted",
            Self::Removed => "cache.removed",
            Self::Evicted => "cache.evicted",
            Self::Cleared => "cache.cleared",
            Self::Error => "cache.error",
        }
    }

    /// The level at which the activity is logged.
    pub fn level(self) -> Level {
        match self {
            Self::Hit | Self::Miss => Level::DEBUG,
            Self::NotUpdated | Self::Exhausted => Level::WARN,
            Self::Error => Level::ERROR,
            Self::Promoted
            | Self::Added
            | Self::AddRejected
            | Self::Stored
            | Self::Updated
            | Self::Removed
            | Self::Evicted
            | Self::Cleared => Level::INFO,
        }
    }
}
