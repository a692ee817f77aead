// Copyright (c) Microsoft Corporation.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Tier contract for building cache layers that take part in a tier chain.
//!
//! This crate defines the [`CacheTier`] trait that every cache layer must satisfy,
//! along with [`CacheKey`] and [`CacheItem`] for item identity and metadata,
//! [`UpdateOutcome`] for conditional updates, and [`Error`] for fallible operations.
//!
//! # Overview
//!
//! A tier only stores items. Keeping several tiers consistent (read-through,
//! evicting stale copies, pushing fresh values, cross-process invalidation) is the
//! job of the `stratum` orchestrator.
//!
//! # Implementing a Cache Tier
//!
//! ```
//! use stratum_tier::{CacheItem, CacheKey, CacheTier, Result, UpdateFn, UpdateOutcome};
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! struct SimpleTier<V>(Mutex<HashMap<CacheKey, CacheItem<V>>>);
//!
//! impl<V: Clone + Send + Sync> CacheTier<V> for SimpleTier<V> {
//!     fn name(&self) -> &str {
//!         "simple"
//!     }
//!
//!     async fn get(&self, key: &CacheKey) -> Result<Option<CacheItem<V>>> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn add(&self, item: CacheItem<V>) -> Result<bool> {
//!         let mut map = self.0.lock().unwrap();
//!         if map.contains_key(item.key()) {
//!             return Ok(false);
//!         }
//!         map.insert(item.key().clone(), item);
//!         Ok(true)
//!     }
//!
//!     async fn put(&self, item: CacheItem<V>) -> Result<()> {
//!         self.0.lock().unwrap().insert(item.key().clone(), item);
//!         Ok(())
//!     }
//!
//!     async fn remove(&self, key: &CacheKey) -> Result<bool> {
//!         Ok(self.0.lock().unwrap().remove(key).is_some())
//!     }
//!
//!     async fn update(&self, key: &CacheKey, update: &UpdateFn<'_, V>, _max_retries: u32) -> Result<UpdateOutcome<V>> {
//!         // The lock makes read-modify-write atomic, so one attempt always suffices.
//!         let mut map = self.0.lock().unwrap();
//!         let Some(current) = map.get(key) else {
//!             return Ok(UpdateOutcome::ItemAbsent);
//!         };
//!         let Some(value) = update(current.value()) else {
//!             return Ok(UpdateOutcome::FactoryProducedNothing);
//!         };
//!         let item = current.with_value(value);
//!         map.insert(key.clone(), item.clone());
//!         Ok(UpdateOutcome::Success { item, attempts: 1 })
//!     }
//!
//!     async fn clear(&self) -> Result<()> {
//!         self.0.lock().unwrap().clear();
//!         Ok(())
//!     }
//!
//!     async fn clear_region(&self, region: &str) -> Result<()> {
//!         self.0.lock().unwrap().retain(|key, _| !key.in_region(region));
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! The `dynamic-tier` feature (on by default) provides [`DynamicTier`], which wraps
//! any `CacheTier` in a type-erased, clonable container so that heterogeneous
//! tiers can be chained.

mod error;
mod item;
mod key;
mod outcome;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;

#[cfg(feature = "dynamic-tier")]
mod dynamic;

#[cfg(feature = "dynamic-tier")]
#[doc(inline)]
pub use dynamic::{DynamicTier, DynamicTierExt};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use item::{CacheItem, Expiration};
#[doc(inline)]
pub use key::CacheKey;
#[doc(inline)]
pub use outcome::{UpdateFailure, UpdateOutcome};
#[doc(inline)]
pub use tier::{CacheTier, UpdateFn};
