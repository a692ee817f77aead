// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Multi-tier cache orchestration.
//!
//! A [`CacheManager`] presents one logical key/value cache backed by an
//! ordered chain of heterogeneous tiers, typically a fast in-process tier in
//! front of a shared, authoritative one, and keeps the tiers consistent:
//!
//! - Reads walk the chain from the front and promote hits forward.
//! - Adds and conditional updates are decided by the last tier; the other
//!   tiers are then repaired by evicting stale copies or storing the fresh
//!   item.
//! - A failed update that leaves the chain in doubt evicts the key from every
//!   other tier, so the next read fetches the authoritative value.
//! - Changes are announced to local event handlers and, through a
//!   [`Backplane`], to other processes, whose listeners evict their local
//!   copies.
//!
//! Retry loops are bounded by attempt count only. A call that needs a deadline
//! wraps the whole operation in a timeout.
//!
//! # Examples
//!
//! ```
//! use stratum::{CacheItem, CacheManager};
//! use tick::Clock;
//! # futures::executor::block_on(async {
//!
//! let cache = CacheManager::<String>::builder(Clock::new_frozen())
//!     .memory()
//!     .memory()
//!     .build()?;
//!
//! let item = cache
//!     .get_or_add("user:1", |key| async move { Some(CacheItem::new(key, "Ada".to_owned())) })
//!     .await?;
//! assert_eq!(item.value(), "Ada");
//!
//! let renamed = cache.update("user:1", |name| Some(format!("{name} Lovelace"))).await?;
//! assert_eq!(renamed, "Ada Lovelace");
//! # Ok::<(), stratum::Error>(())
//! # });
//! ```
//!
//! # Features
//!
//! - `memory` (default): [`InMemoryTier`] and [`CacheManagerBuilder::memory`].
//! - `metrics`: OpenTelemetry metrics through [`TelemetryConfig`].
//! - `test-util`: the `MockTier` of `stratum_tier::testing` and a controllable clock.

pub mod builder;
mod chain;
pub mod events;
mod get_or_add;
mod manager;
pub mod options;
mod remote;
mod state;
mod telemetry;
mod update;

#[doc(inline)]
pub use builder::CacheManagerBuilder;
#[doc(inline)]
pub use events::{CacheEvent, EventOrigin, SubscriptionId};
#[doc(inline)]
pub use manager::CacheManager;
#[doc(inline)]
pub use options::ManagerOptions;
#[doc(inline)]
pub use stratum_backplane::{Backplane, ChangeAction, ChangeNotification, DynamicBackplane, DynamicBackplaneExt};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use stratum_memory::{InMemoryTier, InMemoryTierBuilder};
#[doc(inline)]
pub use stratum_tier::{
    CacheItem, CacheKey, CacheTier, DynamicTier, DynamicTierExt, Error, ErrorKind, Expiration, Result, UpdateFailure, UpdateFn,
    UpdateOutcome,
};
#[doc(inline)]
pub use telemetry::TelemetryConfig;
