// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! OpenTelemetry instruments.

use std::time::Duration;

use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Histogram, MeterProvider},
};

use crate::{
    options::CacheName,
    telemetry::{CacheActivity, CacheOperation},
};

const SCOPE_NAME: &str = "stratum";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

pub(crate) const NAME_KEY: &str = "cache.name";
pub(crate) const OPERATION_KEY: &str = "cache.operation";
pub(crate) const ACTIVITY_KEY: &str = "cache.activity";

pub(crate) const EVENT_COUNT: &str = "cache.event.count";
pub(crate) const OPERATION_DURATION: &str = "cache.operation.duration";

/// The counter and histogram one manager reports into.
#[derive(Clone, Debug)]
pub(crate) struct Instruments {
    events: Counter<u64>,
    durations: Histogram<f64>,
}

impl Instruments {
    pub(crate) fn new(provider: &dyn MeterProvider) -> Self {
        let meter = provider.meter_with_scope(
            InstrumentationScope::builder(SCOPE_NAME)
                .with_version(env!("CARGO_PKG_VERSION"))
                .with_schema_url(SCHEMA_URL)
                .build(),
        );

        Self {
            events: meter
                .u64_counter(EVENT_COUNT)
                .with_description("Completed cache operations, by outcome")
                .with_unit("{event}")
                .build(),
            durations: meter
                .f64_histogram(OPERATION_DURATION)
                .with_description("Time spent in a cache operation")
                .with_unit("s")
                .build(),
        }
    }

    /// Counts one activity; `elapsed` is recorded only for timed operations.
    pub(crate) fn record(&self, name: CacheName, operation: CacheOperation, activity: CacheActivity, elapsed: Option<Duration>) {
        let attributes = [
            KeyValue::new(NAME_KEY, name),
            KeyValue::new(OPERATION_KEY, operation.as_str()),
            KeyValue::new(ACTIVITY_KEY, activity.as_str()),
        ];

        self.events.add(1, &attributes);
        if let Some(elapsed) = elapsed {
            self.durations.record(elapsed.as_secs_f64(), &attributes);
        }
    }
}
