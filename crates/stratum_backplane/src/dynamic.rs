// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic backplane wrapper for type erasure.

use std::{fmt::Debug, sync::Arc};

use futures::stream::BoxStream;
use stratum_tier::Result;

use crate::{Backplane, ChangeNotification, backplane::DynBackplane};

/// Extension trait for converting any `Backplane` into a `DynamicBackplane`.
pub trait DynamicBackplaneExt: Sized {
    /// Converts this backplane into a `DynamicBackplane`.
    fn into_dynamic(self) -> DynamicBackplane;
}

impl<T> DynamicBackplaneExt for T
where
    T: Backplane + 'static,
{
    fn into_dynamic(self) -> DynamicBackplane {
        DynamicBackplane(DynBackplane::new_arc(self))
    }
}

/// A clonable, type-erased backplane.
#[derive(Clone)]
pub struct DynamicBackplane(Arc<DynBackplane<'static>>);

impl Debug for DynamicBackplane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicBackplane").finish_non_exhaustive()
    }
}

impl Backplane for DynamicBackplane {
    async fn publish(&self, notification: ChangeNotification) -> Result<()> {
        self.0.publish(notification).await
    }

    fn subscribe(&self) -> BoxStream<'static, ChangeNotification> {
        self.0.subscribe()
    }
}
