// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Classification of per-tier update outcomes.
//!
//! A conditional update runs against exactly one tier. Its [`UpdateOutcome`]
//! decides how the rest of the chain has to be repaired before the caller
//! sees a result.

use stratum_tier::{CacheItem, UpdateFailure, UpdateOutcome};

/// What the orchestrator does next after a conditional update on one tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Transition<V> {
    /// The tier stored `item`: evict stale copies above it, push the item
    /// below it, then notify.
    Propagate { item: CacheItem<V>, attempts: u32 },

    /// The tier is empty or in an indeterminate state relative to the rest
    /// of the chain: evict the key everywhere else.
    EvictOthers(UpdateFailure),

    /// Nothing changed anywhere, no repair needed.
    Abandon(UpdateFailure),
}

impl<V> From<UpdateOutcome<V>> for Transition<V> {
    fn from(outcome: UpdateOutcome<V>) -> Self {
        match outcome {
            UpdateOutcome::Success { item, attempts } => Self::Propagate { item, attempts },
            UpdateOutcome::ItemAbsent => Self::EvictOthers(UpdateFailure::ItemAbsent),
            UpdateOutcome::RetriesExhausted { .. } => Self::EvictOthers(UpdateFailure::RetriesExhausted),
            UpdateOutcome::FactoryProducedNothing => Self::Abandon(UpdateFailure::FactoryProducedNothing),
        }
    }
}
