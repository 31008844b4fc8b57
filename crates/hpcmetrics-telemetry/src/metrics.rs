// SPDX-License-Identifier: Apache-2.0

//! Self-metrics: the control plane's own health exposed as Prometheus gauges/counters, separate
//! from the HPC metric data it stores.

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

use crate::error::TelemetryError;

/// Process-wide self-metrics registry. One instance is constructed at startup and shared (behind
/// an `Arc`) across the store, cache, archiver, and dispatcher so each can update its own gauges
/// without the admin crate knowing anything about their internals.
pub struct SelfMetrics {
    registry: Registry,
    /// Number of raw samples currently resident in the in-memory store.
    pub store_resident_samples: IntGauge,
    /// Number of jobs queued for archiving but not yet persisted.
    pub archiver_pending: IntGauge,
    /// Cache hits for the dispatcher's result cache.
    pub cache_hits: IntCounter,
    /// Cache misses for the dispatcher's result cache.
    pub cache_misses: IntCounter,
    /// Number of nodes currently reporting stale (overdue) metrics.
    pub health_stale_metrics: IntGauge,
    /// Wall-clock seconds the last archiving sweep took.
    pub archiver_last_sweep_seconds: Gauge,
}

impl SelfMetrics {
    /// Builds a fresh registry and registers every collector against it.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::RegistrationFailed`] if a collector name collides, which would
    /// indicate a bug in this constructor rather than anything callers can act on.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let store_resident_samples = IntGauge::new(
            "hpcmetrics_store_resident_samples",
            "Number of raw samples currently resident in the in-memory store",
        )
        .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_store_resident_samples", source })?;
        registry
            .register(Box::new(store_resident_samples.clone()))
            .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_store_resident_samples", source })?;

        let archiver_pending = IntGauge::new(
            "hpcmetrics_archiver_pending_jobs",
            "Number of jobs queued for archiving but not yet persisted",
        )
        .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_archiver_pending_jobs", source })?;
        registry
            .register(Box::new(archiver_pending.clone()))
            .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_archiver_pending_jobs", source })?;

        let cache_hits = IntCounter::new("hpcmetrics_dispatch_cache_hits_total", "Dispatcher result-cache hits")
            .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_dispatch_cache_hits_total", source })?;
        registry
            .register(Box::new(cache_hits.clone()))
            .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_dispatch_cache_hits_total", source })?;

        let cache_misses = IntCounter::new("hpcmetrics_dispatch_cache_misses_total", "Dispatcher result-cache misses")
            .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_dispatch_cache_misses_total", source })?;
        registry
            .register(Box::new(cache_misses.clone()))
            .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_dispatch_cache_misses_total", source })?;

        let health_stale_metrics = IntGauge::new(
            "hpcmetrics_health_stale_nodes",
            "Number of nodes currently reporting stale (overdue) metrics",
        )
        .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_health_stale_nodes", source })?;
        registry
            .register(Box::new(health_stale_metrics.clone()))
            .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_health_stale_nodes", source })?;

        let archiver_last_sweep_seconds = Gauge::new(
            "hpcmetrics_archiver_last_sweep_seconds",
            "Wall-clock seconds the most recent archiving sweep took",
        )
        .map_err(|source| TelemetryError::RegistrationFailed { name: "hpcmetrics_archiver_last_sweep_seconds", source })?;
        registry.register(Box::new(archiver_last_sweep_seconds.clone())).map_err(|source| {
            TelemetryError::RegistrationFailed { name: "hpcmetrics_archiver_last_sweep_seconds", source }
        })?;

        Ok(SelfMetrics {
            registry,
            store_resident_samples,
            archiver_pending,
            cache_hits,
            cache_misses,
            health_stale_metrics,
            archiver_last_sweep_seconds,
        })
    }

    /// Renders every registered collector in the Prometheus text exposition format, for the
    /// admin crate's `GET /metrics` handler.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Encode`] if the underlying encoder fails, which in practice only
    /// happens if a collector produces a malformed label set.
    pub fn gather(&self) -> Result<Vec<u8>, TelemetryError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer).map_err(TelemetryError::Encode)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_renders_registered_metrics() {
        let metrics = SelfMetrics::new().expect("registry should build");
        metrics.store_resident_samples.set(42);
        metrics.cache_hits.inc();

        let rendered = String::from_utf8(metrics.gather().expect("should encode")).expect("utf8");
        assert!(rendered.contains("hpcmetrics_store_resident_samples 42"));
        assert!(rendered.contains("hpcmetrics_dispatch_cache_hits_total 1"));
    }
}
