// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;

#[cfg(any(feature = "metrics", test))]
use crate::telemetry::instruments::Instruments;
use crate::telemetry::{CacheTelemetry, recorder::Recorder};

/// Which telemetry a cache manager emits.
///
/// Everything is off by default. Pass the configuration to
/// [`CacheManagerBuilder::telemetry`](crate::CacheManagerBuilder::telemetry).
///
/// # Examples
///
/// ```
/// use stratum::TelemetryConfig;
///
/// let config = TelemetryConfig::new().with_logs();
/// assert!(config.is_enabled());
/// assert!(!TelemetryConfig::new().is_enabled());
/// ```
///
/// With the `metrics` feature, `with_metrics` reports into any OpenTelemetry
/// `MeterProvider`:
///
/// ```ignore
/// let config = TelemetryConfig::new().with_logs().with_metrics(&meter_provider);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    logs: bool,
    #[cfg(any(feature = "metrics", test))]
    instruments: Option<Instruments>,
}

impl TelemetryConfig {
    /// Creates a configuration with logs and metrics disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs every operation as a `tracing` event named `cache.event`.
    #[must_use]
    pub fn with_logs(mut self) -> Self {
        self.logs = true;
        self
    }

    /// Reports an operation counter and a duration histogram to `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.instruments = Some(Instruments::new(provider));
        self
    }

    /// Returns `true` if logs or metrics are enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(any(feature = "metrics", test))]
        if self.instruments.is_some() {
            return true;
        }
        self.logs
    }

    pub(crate) fn build(self) -> Option<CacheTelemetry> {
        if !self.is_enabled() {
            return None;
        }

        Some(CacheTelemetry::new(Recorder {
            logs: self.logs,
            #[cfg(any(feature = "metrics", test))]
            instruments: self.instruments,
        }))
    }
}
