// SPDX-License-Identifier: Apache-2.0

//! The metric store itself: tree traversal, write/read, scoped aggregation and health checks.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::chain::WriteRejection;
use crate::error::{BatchWriteOutcome, ReadError, WriteError};
use crate::level::Level;
use crate::path::MetricPath;
use crate::registry::{MetricId, MetricRegistry};
use crate::scope::Scope;
use crate::stats::{derive_statistics_series, JobData, JobMetric, Series};

/// Consecutive missing samples tolerated before a buffer is considered stale.
pub const MAX_MISSING: i64 = 5;

/// Stale-metric count at or above which a subtree is considered unhealthy.
pub const MAX_UNHEALTHY: usize = 5;

/// A single raw sample accepted by [`MetricStore::write_batch`].
#[derive(Debug, Clone)]
pub struct Sample {
    /// Path the sample targets.
    pub path: MetricPath,
    /// Metric name.
    pub metric: String,
    /// Sample timestamp, unix seconds.
    pub timestamp: i64,
    /// Sample value.
    pub value: f32,
}

/// Outcome of a subtree health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    /// Number of metric buffers found stale (no data for `MAX_MISSING` sample periods).
    pub stale_count: usize,
    /// `stale_count < MAX_UNHEALTHY`.
    pub healthy: bool,
}

/// In-memory hierarchical metric store.
///
/// Owns every in-memory sample buffer; the only other holder of a reference to a buffer's
/// contents is a caller mid-read, via a returned `Vec` copy. The registry is published once at
/// startup and treated as read-only afterwards.
pub struct MetricStore {
    root: Arc<Level>,
    registry: RwLock<MetricRegistry>,
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        MetricStore {
            root: Arc::new(Level::new()),
            registry: RwLock::new(MetricRegistry::new()),
        }
    }

    /// Registers a metric name with its sampling frequency, idempotently.
    pub fn register_metric(&self, name: &str, frequency_secs: u32) -> MetricId {
        self.registry.write().register(name, frequency_secs)
    }

    fn resolve_write_level(&self, path: &MetricPath) -> Arc<Level> {
        let cluster = self.root.child_or_create(&path.cluster);
        let host = cluster.child_or_create(&path.host);
        path.segments.iter().fold(host, |level, segment| {
            let key = format!("{}:{}", segment.scope, segment.type_id.as_deref().unwrap_or(""));
            level.child_or_create(&key)
        })
    }

    fn resolve_read_level(&self, path: &MetricPath) -> Option<Arc<Level>> {
        let cluster = self.root.child(&path.cluster)?;
        let host = cluster.child(&path.host)?;
        path.segments.iter().try_fold(host, |level, segment| {
            let key = format!("{}:{}", segment.scope, segment.type_id.as_deref().unwrap_or(""));
            level.child(&key)
        })
    }

    /// Writes a single sample. See [`MetricStore::write_batch`] for the batch form used by the
    /// ingestion front door.
    pub fn write(&self, path: &MetricPath, metric: &str, timestamp: i64, value: f32) -> Result<(), WriteError> {
        let id = self
            .registry
            .read()
            .id_of(metric)
            .ok_or_else(|| WriteError::UnknownMetric(metric.to_owned()))?;
        let frequency = self.registry.read().frequency(id);
        let level = self.resolve_write_level(path);
        level.write(id, timestamp, frequency, value).map_err(|e| match e {
            WriteRejection::OutOfOrder => WriteError::OutOfOrder {
                path: format!("{}/{}", path.cluster, path.host),
                timestamp,
            },
        })
    }

    /// Writes every sample in `batch`, never stopping early; every failure is collected.
    pub fn write_batch(&self, batch: &[Sample]) -> BatchWriteOutcome {
        let mut outcome = BatchWriteOutcome::default();
        for sample in batch {
            match self.write(&sample.path, &sample.metric, sample.timestamp, sample.value) {
                Ok(()) => outcome.accepted += 1,
                Err(e) => outcome.rejected.push(e),
            }
        }
        outcome
    }

    /// Reads a single series at the exact path given, for `[from, to)`.
    pub fn read(&self, path: &MetricPath, metric: &str, from: i64, to: i64) -> Result<(u32, Vec<(i64, f32)>), ReadError> {
        let id = match self.registry.read().id_of(metric) {
            Some(id) => id,
            None => return Ok((0, Vec::new())),
        };
        let level = self
            .resolve_read_level(path)
            .ok_or_else(|| ReadError::UnknownPath(format!("{}/{}", path.cluster, path.host)))?;
        Ok(level
            .with_chain(id, |chain| chain.read(from, to))
            .flatten()
            .unwrap_or((self.registry.read().frequency(id), Vec::new())))
    }

    /// Reads a metric across a subtree at `requested_scope`, aggregating child series (mean
    /// across aligned timesteps) when data was recorded at a finer scope than requested.
    ///
    /// Branches recorded at a coarser scope than requested fall back to their own scope (the
    /// `max-scope` rule); the returned `JobMetric` series each carry their actual host/child id
    /// as `Series::id` so callers can tell which scope served which branch.
    pub fn read_scoped(
        &self,
        path: &MetricPath,
        metric: &str,
        requested_scope: Scope,
        from: i64,
        to: i64,
    ) -> Result<JobMetric, ReadError> {
        let level = self
            .resolve_read_level(path)
            .ok_or_else(|| ReadError::UnknownPath(format!("{}/{}", path.cluster, path.host)))?;

        let id = match self.registry.read().id_of(metric) {
            Some(id) => id,
            None => {
                return Ok(JobMetric {
                    timestep: 0,
                    unit: String::new(),
                    series: Vec::new(),
                    statistics_series: None,
                })
            }
        };
        let frequency = self.registry.read().frequency(id);

        let mut series = Vec::new();
        collect_scoped(&level, &path.host, Scope::Node, requested_scope, id, from, to, &mut series);
        series.sort_by(|a, b| a.id.cmp(&b.id));

        let threshold = crate::stats::DEFAULT_JOB_SERIES_THRESHOLD;
        let statistics_series = derive_statistics_series(&series, threshold);

        Ok(JobMetric {
            timestep: frequency,
            unit: String::new(),
            series,
            statistics_series,
        })
    }

    /// Walks every metric buffer in the subtree rooted at `path`, reporting how many are stale:
    /// `now - chunk_end > MAX_MISSING * frequency`.
    #[must_use]
    pub fn health(&self, path: &MetricPath, now: i64) -> Health {
        let Some(level) = self.resolve_read_level(path) else {
            return Health { stale_count: 0, healthy: true };
        };
        let mut stale = 0usize;
        walk_health(&level, &self.registry.read(), now, &mut stale);
        Health {
            stale_count: stale,
            healthy: stale < MAX_UNHEALTHY,
        }
    }

    /// Bootstraps the store from archived data, writing samples as if they had streamed in.
    pub fn import_archive(&self, path: &MetricPath, data: &JobData) {
        for (metric_name, by_scope) in &data.metrics {
            let Some(id) = self.registry.read().id_of(metric_name) else {
                continue;
            };
            let frequency = self.registry.read().frequency(id);
            for job_metric in by_scope.values() {
                for s in &job_metric.series {
                    let level = if s.id == path.host {
                        self.resolve_write_level(path)
                    } else {
                        self.root.child_or_create(&path.cluster).child_or_create(&path.host).child_or_create(&s.id)
                    };
                    let mut ts = 0i64;
                    for &value in &s.data {
                        if !value.is_nan() {
                            let _ = level.write(id, ts, frequency, value);
                        }
                        ts += i64::from(frequency);
                    }
                }
            }
        }
    }

    /// Runs one retention sweep for the subtree at `path`: drops chunks older than `retention`
    /// seconds relative to `now`. Returns the number of samples freed.
    pub fn evict_before(&self, path: &MetricPath, now: i64, retention_secs: i64) -> usize {
        let Some(level) = self.resolve_read_level(path) else {
            return 0;
        };
        let cutoff = now - retention_secs;
        let mut freed = 0;
        walk_evict(&level, cutoff, &mut freed);
        freed
    }

    /// Runs one retention sweep across an entire cluster subtree, identified by name alone.
    /// Returns the number of samples freed.
    pub fn evict_cluster_before(&self, cluster: &str, now: i64, retention_secs: i64) -> usize {
        let Some(level) = self.root.child(cluster) else {
            return 0;
        };
        let cutoff = now - retention_secs;
        let mut freed = 0;
        walk_evict(&level, cutoff, &mut freed);
        freed
    }

    /// Sums resident sample counts across the whole store, for the memory-tracking worker.
    #[must_use]
    pub fn resident_samples(&self) -> usize {
        let mut total = 0;
        walk_resident(&self.root, &mut total);
        total
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_scoped(
    level: &Level,
    id_label: &str,
    own_scope: Scope,
    requested: Scope,
    metric: MetricId,
    from: i64,
    to: i64,
    out: &mut Vec<Series>,
) {
    let children = level.children_snapshot();

    if children.is_empty() {
        // Finest data ever recorded on this branch; return it as-is regardless of how it compares
        // to `requested` (the `max-scope` fallback for a request finer than what was recorded).
        if let Some(series) = read_series(level, id_label, metric, from, to) {
            out.push(series);
        }
        return;
    }

    if own_scope.rank() >= requested.rank() {
        // This Level sits at (or past) the requested scope. If it carries the metric directly,
        // that is the answer for this branch. Otherwise the metric was only ever recorded below
        // this Level, finer than requested: collect every child's series and fold them into one
        // mean series at aligned timesteps, representing this Level at the requested scope.
        if let Some(series) = read_series(level, id_label, metric, from, to) {
            out.push(series);
            return;
        }
        let mut child_series = Vec::new();
        for (child_id, child) in &children {
            let child_scope = child_id.split(':').next().and_then(|s| s.parse().ok()).unwrap_or(requested);
            collect_scoped(child, child_id, child_scope, requested, metric, from, to, &mut child_series);
        }
        if let Some(mean) = mean_series(id_label, &child_series) {
            out.push(mean);
        }
        return;
    }

    // This Level is coarser than requested: the requested scope narrows into its children.
    // Each child reports under its own label; a child may itself aggregate further descendants.
    for (child_id, child) in children {
        let child_scope = child_id.split(':').next().and_then(|s| s.parse().ok()).unwrap_or(requested);
        collect_scoped(&child, &child_id, child_scope, requested, metric, from, to, out);
    }
}

fn read_series(level: &Level, id_label: &str, metric: MetricId, from: i64, to: i64) -> Option<Series> {
    let (_, data) = level.with_chain(metric, |chain| chain.read(from, to)).flatten()?;
    Some(Series { id: id_label.to_owned(), data: data.into_iter().map(|(_, v)| v).collect() })
}

/// Element-wise mean across `series` at aligned timesteps, `NAN` at a timestep only when every
/// input series is `NAN` (a gap) there. `None` if there is nothing to aggregate.
fn mean_series(id_label: &str, series: &[Series]) -> Option<Series> {
    if series.is_empty() {
        return None;
    }
    let width = series.iter().map(|s| s.data.len()).max().unwrap_or(0);
    let mut data = vec![f32::NAN; width];
    for (t, slot) in data.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for s in series {
            if let Some(&v) = s.data.get(t) {
                if !v.is_nan() {
                    sum += v;
                    count += 1;
                }
            }
        }
        if count > 0 {
            *slot = sum / count as f32;
        }
    }
    Some(Series { id: id_label.to_owned(), data })
}

fn walk_health(level: &Level, registry: &MetricRegistry, now: i64, stale: &mut usize) {
    level.for_each_chain(|id, chain| {
        let frequency = registry.frequency(id);
        if frequency == 0 {
            return;
        }
        match chain.last_end() {
            Some(end) if now - end > MAX_MISSING * i64::from(frequency) => *stale += 1,
            None => *stale += 1,
            _ => {}
        }
    });
    for (_, child) in level.children_snapshot() {
        walk_health(&child, registry, now, stale);
    }
}

fn walk_evict(level: &Level, cutoff: i64, freed: &mut usize) {
    level.for_each_chain_mut(|_, chain| {
        *freed += chain.evict_before(cutoff);
    });
    for (_, child) in level.children_snapshot() {
        walk_evict(&child, cutoff, freed);
    }
}

fn walk_resident(level: &Level, total: &mut usize) {
    level.for_each_chain(|_, chain| *total += chain.resident_samples());
    for (_, child) in level.children_snapshot() {
        walk_resident(&child, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_metric(name: &str, freq: u32) -> MetricStore {
        let store = MetricStore::new();
        store.register_metric(name, freq);
        store
    }

    #[test]
    fn write_then_read_round_trips() {
        let store = store_with_metric("flops_any", 10);
        let path = MetricPath::node("fritz", "f0001");
        for i in 0..5 {
            store.write(&path, "flops_any", i * 10, i as f32).unwrap();
        }
        let (freq, series) = store.read(&path, "flops_any", 0, 50).unwrap();
        assert_eq!(freq, 10);
        assert_eq!(series.len(), 5);
    }

    #[test]
    fn unknown_metric_at_known_path_is_empty_not_error() {
        let store = store_with_metric("flops_any", 10);
        let path = MetricPath::node("fritz", "f0001");
        store.write(&path, "flops_any", 0, 1.0).unwrap();
        let (_, series) = store.read(&path, "mem_used", 0, 10).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn unknown_path_is_an_error() {
        let store = store_with_metric("flops_any", 10);
        let path = MetricPath::node("fritz", "nope");
        let err = store.read(&path, "flops_any", 0, 10).unwrap_err();
        assert!(matches!(err, ReadError::UnknownPath(_)));
    }

    #[test]
    fn scoped_read_aggregates_children() {
        let store = store_with_metric("flops_any", 10);
        let base = MetricPath::node("fritz", "f0001");
        let s0 = base.clone().with_segment(Scope::Socket, "0");
        let s1 = base.clone().with_segment(Scope::Socket, "1");
        store.write(&s0, "flops_any", 0, 2.0).unwrap();
        store.write(&s1, "flops_any", 0, 4.0).unwrap();

        // Recorded at socket scope, queried at node scope: the two sockets fold into a single
        // mean series for the host, not two unaggregated socket series.
        let job_metric = store.read_scoped(&base, "flops_any", Scope::Node, 0, 10).unwrap();
        assert_eq!(job_metric.series.len(), 1);
        assert_eq!(job_metric.series[0].id, "f0001");
        assert_eq!(job_metric.series[0].data.first().copied(), Some(3.0));
    }

    #[test]
    fn scoped_read_keeps_per_host_fallback_when_finer_than_recorded() {
        let store = store_with_metric("flops_any", 10);
        let host = MetricPath::node("fritz", "f0001");
        store.write(&host, "flops_any", 0, 2.0).unwrap();

        // Nothing is recorded below node scope on this host, so a request for core scope falls
        // back to the host's own recorded series rather than returning nothing.
        let job_metric = store.read_scoped(&host, "flops_any", Scope::Core, 0, 10).unwrap();
        assert_eq!(job_metric.series.len(), 1);
        assert_eq!(job_metric.series[0].data.first().copied(), Some(2.0));
    }

    #[test]
    fn scoped_read_matches_exact_scope_without_aggregating() {
        let store = store_with_metric("flops_any", 10);
        let base = MetricPath::node("fritz", "f0001");
        let s0 = base.clone().with_segment(Scope::Socket, "0");
        let s1 = base.clone().with_segment(Scope::Socket, "1");
        store.write(&s0, "flops_any", 0, 2.0).unwrap();
        store.write(&s1, "flops_any", 0, 4.0).unwrap();

        let job_metric = store.read_scoped(&base, "flops_any", Scope::Socket, 0, 10).unwrap();
        assert_eq!(job_metric.series.len(), 2);
    }

    #[test]
    fn health_flags_stale_buffers() {
        let store = store_with_metric("flops_any", 10);
        let path = MetricPath::node("fritz", "f0001");
        store.write(&path, "flops_any", 0, 1.0).unwrap();
        let health = store.health(&path, 1_000);
        assert_eq!(health.stale_count, 1);
        assert!(!health.healthy || health.stale_count < MAX_UNHEALTHY);
    }

    #[test]
    fn batch_write_reports_partial_failures() {
        let store = store_with_metric("flops_any", 10);
        let path = MetricPath::node("fritz", "f0001");
        let batch = vec![
            Sample { path: path.clone(), metric: "flops_any".into(), timestamp: 100, value: 1.0 },
            Sample { path: path.clone(), metric: "flops_any".into(), timestamp: 50, value: 2.0 },
            Sample { path, metric: "unknown".into(), timestamp: 0, value: 0.0 },
        ];
        let outcome = store.write_batch(&batch);
        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.rejected.len(), 2);
    }
}
