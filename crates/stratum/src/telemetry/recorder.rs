// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tracing::Level;

#[cfg(any(feature = "metrics", test))]
use crate::telemetry::instruments::Instruments;
use crate::{
    options::CacheName,
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry},
};

/// What a [`CacheTelemetry`] reports to.
#[derive(Clone, Debug)]
pub(crate) struct Recorder {
    pub(crate) logs: bool,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) instruments: Option<Instruments>,
}

impl CacheTelemetry {
    pub(crate) fn new(recorder: Recorder) -> Self {
        Self {
            recorder: thread_aware::Arc::from_unaware(recorder),
        }
    }

    /// Records one activity of `operation`; `elapsed` is set for the
    /// activity that concludes a timed operation.
    pub(crate) fn record(&self, name: CacheName, operation: CacheOperation, activity: CacheActivity, elapsed: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(instruments) = &self.recorder.instruments {
            instruments.record(name, operation, activity, elapsed);
        }

        if self.recorder.logs {
            log(name, operation, activity, elapsed);
        }
    }
}

fn log(name: CacheName, operation: CacheOperation, activity: CacheActivity, elapsed: Option<Duration>) {
    let duration_ns = elapsed.map(|elapsed| elapsed.as_nanos());

    // `tracing::event!` needs a constant level.
    macro_rules! log_at {
        ($level:expr) => {
            tracing::event!(
                $level,
                cache.name = name,
                cache.operation = operation.as_str(),
                cache.activity = activity.as_str(),
                cache.duration_ns = ?duration_ns,
                "cache.event"
            )
        };
    }

    match activity.level() {
        Level::ERROR => log_at!(Level::ERROR),
        Level::WARN => log_at!(Level::WARN),
        Level::INFO => log_at!(Level::INFO),
        _ => log_at!(Level::DEBUG),
    }
}
