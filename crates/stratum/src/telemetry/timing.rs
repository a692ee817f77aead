// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tick::Clock;

/// Runs `work` and returns its output with the time it took on `clock`.
pub(crate) async fn timed<T>(clock: &Clock, work: impl Future<Output = T>) -> (T, Duration) {
    let started = clock.instant();
    let output = work.await;
    (output, clock.instant().saturating_duration_since(started))
}
