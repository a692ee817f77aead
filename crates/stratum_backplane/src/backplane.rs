// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for change-notification transports.

use futures::stream::BoxStream;
use stratum_tier::Result;

use crate::ChangeNotification;

/// A best-effort publish/subscribe channel for cache change notifications.
///
/// Each `Backplane` value represents one participant. Notifications published
/// by a participant are delivered to every other participant's subscription,
/// never back to its own. No delivery or ordering guarantee across
/// participants is assumed by the orchestrator.
#[cfg_attr(
    feature = "dynamic-backplane",
    dynosaur::dynosaur(pub(crate) DynBackplane = dyn(box) Backplane, bridge(none))
)]
pub trait Backplane: Send + Sync {
    /// Publishes a notification to the other participants.
    fn publish(&self, notification: ChangeNotification) -> impl Future<Output = Result<()>> + Send;

    /// Opens a stream of notifications published by the other participants.
    ///
    /// Only notifications published after the call are delivered.
    fn subscribe(&self) -> BoxStream<'static, ChangeNotification>;
}
