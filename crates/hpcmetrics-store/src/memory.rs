// SPDX-License-Identifier: Apache-2.0

//! Periodic worker exposing the store's resident sample count as a self-telemetry gauge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::MetricStore;

/// Shared handle a telemetry registry can read to expose the current resident-sample gauge
/// without depending on this crate's worker-spawning machinery.
#[derive(Default)]
pub struct MemoryGauge {
    samples: AtomicU64,
}

impl MemoryGauge {
    /// Current resident sample count, as of the last sampling tick.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    fn set(&self, value: u64) {
        self.samples.store(value, Ordering::Relaxed);
    }
}

/// Spawns the periodic memory-tracking worker. Runs until `cancel` is triggered.
pub fn spawn(
    store: Arc<MetricStore>,
    gauge: Arc<MemoryGauge>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("memory tracker shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let resident = store.resident_samples() as u64;
                    gauge.set(resident);
                    tracing::trace!(resident, "sampled store memory");
                }
            }
        }
    })
}
