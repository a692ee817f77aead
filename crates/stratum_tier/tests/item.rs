// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `CacheItem` and `Expiration`.

use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use stratum_tier::{CacheItem, CacheKey, Expiration};

fn epoch_plus(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn new_item_has_no_timestamps_and_inherits_expiration() {
    let item = CacheItem::new("k", "v");
    assert_eq!(item.expiration(), Expiration::Inherit);
    assert_eq!(item.created_at(), None);
    assert_eq!(item.last_accessed(), None);
    assert_eq!(item.key(), &CacheKey::new("k"));
}

#[test]
fn with_value_keeps_identity_and_metadata() {
    let mut item = CacheItem::new(("k", "r"), 1).with_expiration(Expiration::Absolute(Duration::from_secs(10)));
    item.set_created_at(epoch_plus(100));
    item.set_last_accessed(epoch_plus(105));

    let next = item.with_value(2);

    assert_eq!(*next.value(), 2);
    assert_eq!(next.key(), item.key());
    assert_eq!(next.expiration(), item.expiration());
    assert_eq!(next.created_at(), Some(epoch_plus(100)));
    assert_eq!(next.last_accessed(), Some(epoch_plus(105)));
}

#[test]
fn deref_and_into_value() {
    let item = CacheItem::new("k", String::from("hello"));
    assert_eq!(item.len(), 5);
    assert_eq!(item.into_value(), "hello");
}

#[test]
fn absolute_expiration_counts_from_creation() {
    let mut item = CacheItem::new("k", 1).with_expiration(Expiration::Absolute(Duration::from_secs(10)));
    item.set_created_at(epoch_plus(100));
    item.set_last_accessed(epoch_plus(109));

    assert!(!item.is_expired(epoch_plus(109)));
    assert!(item.is_expired(epoch_plus(110)));
}

#[test]
fn sliding_expiration_counts_from_last_access() {
    let mut item = CacheItem::new("k", 1).with_expiration(Expiration::Sliding(Duration::from_secs(10)));
    item.set_created_at(epoch_plus(100));

    assert!(item.is_expired(epoch_plus(110)));

    item.set_last_accessed(epoch_plus(108));
    assert!(!item.is_expired(epoch_plus(110)));
    assert!(item.is_expired(epoch_plus(118)));
}

#[test]
fn never_and_inherit_do_not_expire() {
    let mut never = CacheItem::new("k", 1).with_expiration(Expiration::Never);
    never.set_created_at(epoch_plus(0));
    assert!(!never.is_expired(epoch_plus(1_000_000)));

    let mut inherit = CacheItem::new("k", 1);
    inherit.set_created_at(epoch_plus(0));
    assert!(!inherit.is_expired(epoch_plus(1_000_000)));
}

#[test]
fn unstored_item_does_not_expire() {
    let item = CacheItem::new("k", 1).with_expiration(Expiration::Absolute(Duration::ZERO));
    assert!(!item.is_expired(epoch_plus(1)));
}

#[test]
fn expiration_or_resolves_inherit_only() {
    let fallback = Expiration::Sliding(Duration::from_secs(1));
    assert_eq!(Expiration::Inherit.or(fallback), fallback);
    assert_eq!(Expiration::Never.or(fallback), Expiration::Never);
}
