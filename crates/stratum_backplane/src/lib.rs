// Copyright (c) Microsoft Corporation.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Change-notification backplane for multi-process cache consistency.
//!
//! When several processes share a distributed tier but each keeps its own
//! in-process tier in front of it, a change made by one process leaves stale
//! copies in the others. A [`Backplane`] carries [`ChangeNotification`]s between
//! processes so that each one can evict its local copies.
//!
//! The transport is best-effort: the orchestrator never waits for delivery and
//! never treats a notification as a source of truth.
//!
//! # Features
//!
//! - `dynamic-backplane` (default): [`DynamicBackplane`] for type erasure.
//! - `in-process` (default): [`InProcessBackplane`], a broadcast hub for
//!   participants in a single process.

mod backplane;
#[cfg(feature = "dynamic-backplane")]
mod dynamic;
#[cfg(feature = "in-process")]
mod in_process;
mod notification;

#[doc(inline)]
pub use backplane::Backplane;
#[cfg(feature = "dynamic-backplane")]
#[doc(inline)]
pub use dynamic::{DynamicBackplane, DynamicBackplaneExt};
#[cfg(feature = "in-process")]
#[doc(inline)]
pub use in_process::InProcessBackplane;
#[doc(inline)]
pub use notification::{ChangeAction, ChangeNotification};
