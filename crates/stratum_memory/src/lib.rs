// Copyright (c) Microsoft Corporation.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! High-performance in-process cache tier backed by moka.
//!
//! This crate provides [`InMemoryTier`], a concurrent [`CacheTier`](stratum_tier::CacheTier)
//! using moka's `TinyLFU` eviction. Use [`InMemoryTierBuilder`] to configure capacity
//! and the default expiration without exposing moka types.
//!
//! # Quick Start
//!
//! ```
//! use stratum_memory::InMemoryTier;
//! use stratum_tier::{CacheItem, CacheKey, CacheTier, Expiration};
//! use std::time::Duration;
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let tier = InMemoryTier::<i32>::builder(Clock::new_frozen())
//!     .max_capacity(1000)
//!     .default_expiration(Expiration::Sliding(Duration::from_secs(300)))
//!     .build();
//!
//! tier.put(CacheItem::new(("key", "region"), 42)).await?;
//! let item = tier.get(&CacheKey::with_region("key", "region")).await?;
//! assert_eq!(*item.unwrap().value(), 42);
//! # Ok::<(), stratum_tier::Error>(())
//! # });
//! ```
//!
//! # Features
//!
//! - **Capacity limits**: Set maximum item count with automatic eviction
//! - **Expiration**: Absolute and sliding per-item expiration, driven by a [`tick::Clock`]
//! - **Regions**: Items can be grouped into regions and cleared per region
//! - **Conditional updates**: Versioned compare-and-swap with bounded retries

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::InMemoryTierBuilder;
#[doc(inline)]
pub use tier::InMemoryTier;
