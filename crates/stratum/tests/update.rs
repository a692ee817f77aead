// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for conditional updates across a tier chain.

use futures::{FutureExt, StreamExt};
use pretty_assertions::assert_eq;
use stratum::{Backplane, CacheItem, CacheKey, CacheManager, ChangeNotification, Error, ErrorKind, UpdateFailure};
use stratum_backplane::InProcessBackplane;
use stratum_tier::testing::{MockTier, TierOp};
use tick::Clock;

type TestResult = Result<(), Error>;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn append_two() -> impl Fn(&String) -> Option<String> + Send + Sync {
    |value: &String| Some(format!("{value}-2"))
}

/// A fast front tier and a slow authoritative tier that both hold `k = v1`.
fn fast_and_slow() -> (MockTier<String>, MockTier<String>) {
    let item = CacheItem::new("k", "v1".to_owned());
    (
        MockTier::with_items("fast", [item.clone()]),
        MockTier::with_items("slow", [item]),
    )
}

#[test]
fn update_evicts_front_and_notifies_once() -> TestResult {
    block_on(async {
        let (fast, slow) = fast_and_slow();
        let backplane = InProcessBackplane::new();
        let mut remote = backplane.connect().subscribe();
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(fast.clone())
            .tier(slow.clone())
            .backplane(backplane)
            .build()?;

        let value = cache.update("k", append_two()).await?;

        assert_eq!(value, "v1-2");
        assert_eq!(slow.peek(&CacheKey::new("k")).unwrap().value(), "v1-2");
        assert!(!fast.contains_key(&CacheKey::new("k")));
        assert_eq!(slow.operations(), vec![TierOp::Update(CacheKey::new("k"))]);

        assert_eq!(remote.next().await, Some(ChangeNotification::Update(CacheKey::new("k"))));
        assert_eq!(remote.next().now_or_never(), None, "exactly one notification");

        assert_eq!(cache.get_value("k").await?.as_deref(), Some("v1-2"));
        Ok(())
    })
}

#[test]
fn update_evicts_every_tier_in_front_of_the_last() -> TestResult {
    block_on(async {
        let front = MockTier::with_items("front", [CacheItem::new("k", "v1".to_owned())]);
        let middle = MockTier::with_items("middle", [CacheItem::new("k", "v1".to_owned())]);
        let back = MockTier::with_items("back", [CacheItem::new("k", "v1".to_owned())]);
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(front.clone())
            .tier(middle.clone())
            .tier(back.clone())
            .build()?;

        assert_eq!(cache.update("k", append_two()).await?, "v1-2");
        assert!(!front.contains_key(&CacheKey::new("k")));
        assert!(!middle.contains_key(&CacheKey::new("k")));
        assert_eq!(back.peek(&CacheKey::new("k")).unwrap().value(), "v1-2");
        Ok(())
    })
}

#[test]
fn exhausted_update_evicts_other_tiers() {
    block_on(async {
        let (fast, slow) = fast_and_slow();
        slow.exhaust_updates(true);
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(fast.clone())
            .tier(slow.clone())
            .build()
            .unwrap();

        let error = cache.update("k", append_two()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
        assert_eq!(error.update_failure(), Some(UpdateFailure::RetriesExhausted));

        assert!(!fast.contains_key(&CacheKey::new("k")));
        assert_eq!(slow.peek(&CacheKey::new("k")).unwrap().value(), "v1");
    });
}

#[test]
fn try_update_reports_failure_as_none() -> TestResult {
    block_on(async {
        let (fast, slow) = fast_and_slow();
        slow.exhaust_updates(true);
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(fast.clone())
            .tier(slow)
            .build()?;

        assert_eq!(cache.try_update("k", append_two()).await?, None);
        assert!(!fast.contains_key(&CacheKey::new("k")));
        Ok(())
    })
}

#[test]
fn update_of_absent_key_evicts_stale_front_copy() {
    block_on(async {
        let front = MockTier::with_items("front", [CacheItem::new("k", "stale".to_owned())]);
        let back = MockTier::new("back");
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(front.clone())
            .tier(back)
            .build()
            .unwrap();

        let error = cache.update("k", append_two()).await.unwrap_err();
        assert_eq!(error.update_failure(), Some(UpdateFailure::ItemAbsent));
        assert!(!front.contains_key(&CacheKey::new("k")));
    });
}

#[test]
fn declined_update_changes_nothing() {
    block_on(async {
        let (fast, slow) = fast_and_slow();
        let backplane = InProcessBackplane::new();
        let mut remote = backplane.connect().subscribe();
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(fast.clone())
            .tier(slow.clone())
            .backplane(backplane)
            .build()
            .unwrap();

        let error = cache.update("k", |_: &String| None).await.unwrap_err();
        assert_eq!(error.update_failure(), Some(UpdateFailure::FactoryProducedNothing));

        assert_eq!(fast.peek(&CacheKey::new("k")).unwrap().value(), "v1");
        assert_eq!(slow.peek(&CacheKey::new("k")).unwrap().value(), "v1");
        assert_eq!(remote.next().now_or_never(), None);
    });
}

#[test]
fn failing_tier_error_is_propagated() {
    block_on(async {
        let (fast, slow) = fast_and_slow();
        slow.fail_when(|op| matches!(op, TierOp::Update(_)));
        let cache = CacheManager::builder(Clock::new_frozen()).tier(fast).tier(slow).build().unwrap();

        let error = cache.update("k", append_two()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Tier);
        assert_eq!(error.update_failure(), None);
    });
}

#[cfg(feature = "memory")]
#[test]
fn add_or_update_converges() -> TestResult {
    block_on(async {
        let cache = CacheManager::<u64>::builder(Clock::new_frozen()).memory().memory().build()?;

        for expected in 1..=5 {
            let value = cache.add_or_update(CacheItem::new("hits", 1), |v| Some(v + 1)).await?;
            assert_eq!(value, expected);
        }
        assert_eq!(cache.get_value("hits").await?, Some(5));
        Ok(())
    })
}

#[test]
fn add_or_update_gives_up_after_its_budget() {
    block_on(async {
        let back = MockTier::with_items("back", [CacheItem::new("k", 1_u64)]);
        back.exhaust_updates(true);
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(MockTier::new("front"))
            .tier(back.clone())
            .build()
            .unwrap();

        let error = cache
            .add_or_update_with_retries(CacheItem::new("k", 1), |v| Some(v + 1), 2)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
        assert!(error.to_string().contains("3 attempts"), "{error}");

        let adds = back.operations().iter().filter(|op| matches!(op, TierOp::Add(_))).count();
        assert_eq!(adds, 3);

        assert_eq!(
            cache.try_add_or_update(CacheItem::new("k", 1), |v| Some(v + 1)).await.unwrap(),
            None
        );
    });
}

#[test]
fn try_add_or_update_honors_explicit_budget() {
    block_on(async {
        let back = MockTier::with_items("back", [CacheItem::new("k", 1_u64)]);
        back.exhaust_updates(true);
        let cache = CacheManager::builder(Clock::new_frozen())
            .tier(back.clone())
            .max_retries(5)
            .build()
            .unwrap();

        let outcome = cache
            .try_add_or_update_with_retries(CacheItem::new("k", 1), |v| Some(v + 1), 0)
            .await
            .unwrap();
        assert_eq!(outcome, None);

        let adds = back.operations().iter().filter(|op| matches!(op, TierOp::Add(_))).count();
        assert_eq!(adds, 1);
    });
}
