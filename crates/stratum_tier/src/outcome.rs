// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Results of a conditional update on a single tier.

use std::fmt::{Display, Formatter};

use crate::CacheItem;

/// The result of attempting a conditional update on exactly one tier.
///
/// Only [`UpdateOutcome::Success`] carries an item; the other variants carry
/// no value at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome<V> {
    /// The new value was persisted.
    Success {
        /// The item as stored after the update.
        item: CacheItem<V>,
        /// Number of attempts the tier needed, including the successful one.
        attempts: u32,
    },
    /// The key was not present in the tier.
    ItemAbsent,
    /// The update function declined to produce a value.
    FactoryProducedNothing,
    /// The tier could not apply the change within its retry budget.
    RetriesExhausted {
        /// Number of attempts the tier made.
        attempts: u32,
    },
}

impl<V> UpdateOutcome<V> {
    /// Returns the failure class, or `None` on success.
    #[must_use]
    pub fn failure(&self) -> Option<UpdateFailure> {
        match self {
            Self::Success { .. } => None,
            Self::ItemAbsent => Some(UpdateFailure::ItemAbsent),
            Self::FactoryProducedNothing => Some(UpdateFailure::FactoryProducedNothing),
            Self::RetriesExhausted { .. } => Some(UpdateFailure::RetriesExhausted),
        }
    }

    /// Returns `true` for [`UpdateOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Why a conditional update did not succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateFailure {
    /// The key was not present in the attempted tier.
    ItemAbsent,
    /// The update function declined to produce a value.
    FactoryProducedNothing,
    /// The attempted tier could not apply the change within its retry budget.
    RetriesExhausted,
}

impl Display for UpdateFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ItemAbsent => "item does not exist",
            Self::FactoryProducedNothing => "update function produced no value",
            Self::RetriesExhausted => "too many retries",
        })
    }
}
