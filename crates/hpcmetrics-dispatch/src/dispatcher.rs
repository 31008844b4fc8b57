// SPDX-License-Identifier: Apache-2.0

//! The metric dispatcher: routes job reads to the live store or the archive, resamples,
//! derives statistics and caches the result.

use std::collections::HashMap;
use std::sync::Arc;

use hpcmetrics_archive::ArchiveBackend;
use hpcmetrics_cache::Cache;
use hpcmetrics_store::{MetricPath, MetricStore, Scope, Series, StatisticsSeries};
use hpcmetrics_store::{JobData, JobMetric};
use tokio_util::sync::CancellationToken;

use crate::cache_key::DispatchKey;
use crate::error::DispatchError;
use crate::job::JobRef;
use crate::lttb;

/// Metrics that, when node scope is requested, must additionally carry a node-scope rollup even
/// if they were also requested at a finer scope.
const NODE_ROLLUP_METRICS: &[&str] = &["flops_any", "mem_bw"];

/// Routes job and node queries between the live metric store and the archive, applies
/// LTTB resampling on the archive path, and caches results keyed by job/state/request shape.
pub struct MetricDispatcher {
    store: Arc<MetricStore>,
    archive: Arc<dyn ArchiveBackend>,
    cache: Cache<DispatchKey, JobData>,
    archive_enabled: bool,
}

impl MetricDispatcher {
    /// Builds a dispatcher over a live store and an archive backend, with a result cache of the
    /// given byte budget.
    #[must_use]
    pub fn new(store: Arc<MetricStore>, archive: Arc<dyn ArchiveBackend>, cache_budget: usize, archive_enabled: bool) -> Self {
        MetricDispatcher {
            store,
            archive,
            cache: Cache::new(cache_budget),
            archive_enabled,
        }
    }

    /// The primary read path: returns per-metric, per-scope series for `job`, resampled to
    /// `resolution` when the data came from the archive.
    pub async fn load_data(
        &self,
        job: &JobRef,
        metrics: &[String],
        scopes: &[Scope],
        resolution: u32,
        cancel: &CancellationToken,
    ) -> Result<Arc<JobData>, DispatchError> {
        let key = DispatchKey::new(
            job.job_id,
            job.monitoring_status,
            metrics.to_vec(),
            scopes.iter().map(Scope::to_string).collect(),
            resolution,
        );
        let ttl = key.ttl();

        let job = job.clone();
        let metrics = metrics.to_vec();
        let scopes = scopes.to_vec();
        let cancel = cancel.clone();

        self.cache
            .get_or_compute(key, move || async move {
                if cancel.is_cancelled() {
                    return Err(DispatchError::Cancelled);
                }
                let data = if job.should_read_live(self.archive_enabled) {
                    self.load_from_store(&job, &metrics, &scopes, &cancel)?
                } else {
                    self.load_from_archive(&job, &metrics, &scopes, resolution).await?
                };
                let size = estimate_size(&data);
                Ok((data, Some(ttl), size))
            })
            .await
    }

    fn load_from_store(
        &self,
        job: &JobRef,
        metrics: &[String],
        scopes: &[Scope],
        cancel: &CancellationToken,
    ) -> Result<JobData, DispatchError> {
        let mut data = JobData::default();
        for metric in metrics {
            let mut by_scope = HashMap::new();
            for &scope in scopes {
                if cancel.is_cancelled() {
                    return Err(DispatchError::Cancelled);
                }
                let mut series = Vec::new();
                for host in &job.resources {
                    let path = MetricPath::node(&job.cluster, host);
                    match self.store.read_scoped(&path, metric, scope, 0, i64::MAX) {
                        Ok(job_metric) => series.extend(job_metric.series),
                        Err(hpcmetrics_store::ReadError::UnknownPath(_)) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, host, "partial store read failure");
                        }
                    }
                }
                let statistics_series = derive_stats(&series);
                by_scope.insert(
                    scope.to_string(),
                    JobMetric { timestep: 0, unit: String::new(), series, statistics_series },
                );
            }
            data.metrics.insert(metric.clone(), by_scope);
        }
        ensure_node_rollups(&mut data, scopes);
        Ok(data)
    }

    /// Per-metric average/min/max across every series at node scope, the summary shown on the
    /// job list and fed into the archiver's footprint computation. Short-circuits through
    /// [`Self::load_data`], so completed jobs transparently pull from the archive.
    pub async fn load_job_stats(
        &self,
        job: &JobRef,
        metrics: &[String],
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, JobStat>, DispatchError> {
        let data = self.load_data(job, metrics, &[Scope::Node], 0, cancel).await?;
        Ok(stats_for_scope(&data, &Scope::Node.to_string()))
    }

    /// Like [`Self::load_job_stats`] but broken out per requested scope, for the job-view
    /// footprint table.
    pub async fn load_scoped_job_stats(
        &self,
        job: &JobRef,
        metrics: &[String],
        scopes: &[Scope],
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, HashMap<String, JobStat>>, DispatchError> {
        let data = self.load_data(job, metrics, scopes, 0, cancel).await?;
        Ok(scoped_stats(&data))
    }

    /// Bare per-metric averages, the shape persisted as a job's `footprint` field.
    pub async fn load_averages(
        &self,
        job: &JobRef,
        metrics: &[String],
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, f64>, DispatchError> {
        let stats = self.load_job_stats(job, metrics, cancel).await?;
        Ok(stats.into_iter().map(|(metric, stat)| (metric, stat.avg)).collect())
    }

    /// Current-state metrics for a single node, independent of any job. Always reads the live
    /// store: node monitoring reflects the present, not history.
    pub async fn load_node_data(
        &self,
        cluster: &str,
        host: &str,
        metrics: &[String],
        scopes: &[Scope],
        cancel: &CancellationToken,
    ) -> Result<JobData, DispatchError> {
        let mut data = JobData::default();
        let path = MetricPath::node(cluster, host);
        for metric in metrics {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }
            let mut by_scope = HashMap::new();
            for &scope in scopes {
                let series = match self.store.read_scoped(&path, metric, scope, 0, i64::MAX) {
                    Ok(job_metric) => job_metric.series,
                    Err(hpcmetrics_store::ReadError::UnknownPath(_)) => Vec::new(),
                    Err(e) => {
                        tracing::warn!(error = %e, host, "partial store read failure for node data");
                        Vec::new()
                    }
                };
                let statistics_series = derive_stats(&series);
                by_scope.insert(
                    scope.to_string(),
                    JobMetric { timestep: 0, unit: String::new(), series, statistics_series },
                );
            }
            data.metrics.insert(metric.clone(), by_scope);
        }
        Ok(data)
    }

    /// Current node-scope metrics across a whole node list, one series per host. Used by the
    /// node-list view, which synthesises min/median/max once the host count passes
    /// [`hpcmetrics_store::stats::DEFAULT_NODE_LIST_SERIES_THRESHOLD`].
    pub async fn load_node_list_data(
        &self,
        cluster: &str,
        hosts: &[String],
        metrics: &[String],
        cancel: &CancellationToken,
    ) -> Result<JobData, DispatchError> {
        let mut data = JobData::default();
        for metric in metrics {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }
            let mut series = Vec::new();
            for host in hosts {
                let path = MetricPath::node(cluster, host);
                match self.store.read_scoped(&path, metric, Scope::Node, 0, i64::MAX) {
                    Ok(job_metric) => series.extend(job_metric.series),
                    Err(hpcmetrics_store::ReadError::UnknownPath(_)) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, host, "partial store read failure for node-list data");
                    }
                }
            }
            let statistics_series = hpcmetrics_store::stats::derive_statistics_series(
                &series,
                hpcmetrics_store::stats::DEFAULT_NODE_LIST_SERIES_THRESHOLD,
            );
            let mut by_scope = HashMap::new();
            by_scope.insert(
                Scope::Node.to_string(),
                JobMetric { timestep: 0, unit: String::new(), series, statistics_series },
            );
            data.metrics.insert(metric.clone(), by_scope);
        }
        Ok(data)
    }

    async fn load_from_archive(
        &self,
        job: &JobRef,
        metrics: &[String],
        scopes: &[Scope],
        resolution: u32,
    ) -> Result<JobData, DispatchError> {
        let entry = self
            .archive
            .load_job_data(&job.cluster, job.job_id, job.start_time)
            .await?;
        // Deep copy: cached archive documents are shared and must never be mutated in place.
        let mut data = entry.data.clone();

        for by_scope in data.metrics.values_mut() {
            for job_metric in by_scope.values_mut() {
                let original_freq = job_metric.timestep;
                for series in &mut job_metric.series {
                    if lttb::should_resample(series.data.len(), original_freq, resolution) {
                        let target_len = (series.data.len() * original_freq as usize) / resolution.max(1) as usize;
                        series.data = lttb::downsample(&series.data, target_len.max(3));
                    }
                }
                job_metric.statistics_series = derive_stats(&job_metric.series);
            }
        }

        project(&mut data, metrics, scopes);
        ensure_node_rollups(&mut data, scopes);
        round_statistics(&mut data);
        Ok(data)
    }
}

/// A single series' worth of summary statistics, rounded to two decimal places: the same shape
/// computed for a job's `footprint` (see the archiver pipeline) and for job-view stat tables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JobStat {
    /// Average of each series' own average.
    pub avg: f64,
    /// Minimum across every series' own minimum.
    pub min: f64,
    /// Maximum across every series' own maximum.
    pub max: f64,
}

fn stat_for_series(series: &[Series]) -> JobStat {
    let mut avgs = Vec::with_capacity(series.len());
    let mut mins = Vec::with_capacity(series.len());
    let mut maxs = Vec::with_capacity(series.len());

    for s in series {
        let values: Vec<f32> = s.data.iter().copied().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            continue;
        }
        let sum: f32 = values.iter().sum();
        avgs.push(sum / values.len() as f32);
        mins.push(values.iter().copied().fold(f32::INFINITY, f32::min));
        maxs.push(values.iter().copied().fold(f32::NEG_INFINITY, f32::max));
    }

    if avgs.is_empty() {
        return JobStat::default();
    }

    let avg = avgs.iter().sum::<f32>() / avgs.len() as f32;
    let min = mins.iter().copied().fold(f32::INFINITY, f32::min);
    let max = maxs.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    JobStat { avg: f64::from(round2(avg)), min: f64::from(round2(min)), max: f64::from(round2(max)) }
}

fn stats_for_scope(data: &JobData, scope: &str) -> HashMap<String, JobStat> {
    data.metrics
        .iter()
        .filter_map(|(metric, by_scope)| by_scope.get(scope).map(|jm| (metric.clone(), stat_for_series(&jm.series))))
        .collect()
}

fn scoped_stats(data: &JobData) -> HashMap<String, HashMap<String, JobStat>> {
    data.metrics
        .iter()
        .map(|(metric, by_scope)| {
            let per_scope =
                by_scope.iter().map(|(scope, jm)| (scope.clone(), stat_for_series(&jm.series))).collect();
            (metric.clone(), per_scope)
        })
        .collect()
}

fn derive_stats(series: &[Series]) -> Option<StatisticsSeries> {
    hpcmetrics_store::stats::derive_statistics_series(series, hpcmetrics_store::stats::DEFAULT_JOB_SERIES_THRESHOLD)
}

fn project(data: &mut JobData, metrics: &[String], scopes: &[Scope]) {
    let scope_names: Vec<String> = scopes.iter().map(Scope::to_string).collect();
    data.metrics.retain(|name, _| metrics.is_empty() || metrics.contains(name));
    for by_scope in data.metrics.values_mut() {
        by_scope.retain(|scope, _| scope_names.is_empty() || scope_names.contains(scope));
    }
}

fn ensure_node_rollups(data: &mut JobData, scopes: &[Scope]) {
    if !scopes.contains(&Scope::Node) {
        return;
    }
    for metric_name in NODE_ROLLUP_METRICS {
        let Some(by_scope) = data.metrics.get_mut(*metric_name) else { continue };
        if by_scope.contains_key(&Scope::Node.to_string()) {
            continue;
        }
        // Synthesize a node-scope rollup by averaging whatever finer-scope series exist, so
        // callers that only asked for node scope still see these two metrics there.
        let mut contributors: Vec<Series> = Vec::new();
        for job_metric in by_scope.values() {
            contributors.extend(job_metric.series.iter().cloned());
        }
        if contributors.is_empty() {
            continue;
        }
        let width = contributors.iter().map(|s| s.data.len()).max().unwrap_or(0);
        let mut rollup = vec![0.0f32; width];
        let mut counts = vec![0u32; width];
        for series in &contributors {
            for (i, v) in series.data.iter().enumerate() {
                if !v.is_nan() {
                    rollup[i] += v;
                    counts[i] += 1;
                }
            }
        }
        for (v, c) in rollup.iter_mut().zip(counts.iter()) {
            *v = if *c > 0 { *v / *c as f32 } else { f32::NAN };
        }
        by_scope.insert(
            Scope::Node.to_string(),
            JobMetric {
                timestep: 0,
                unit: String::new(),
                series: vec![Series { id: "rollup".into(), data: rollup }],
                statistics_series: None,
            },
        );
    }
}

fn round_statistics(data: &mut JobData) {
    for by_scope in data.metrics.values_mut() {
        for job_metric in by_scope.values_mut() {
            if let Some(stats) = &mut job_metric.statistics_series {
                for v in stats.min.iter_mut().chain(stats.median.iter_mut()).chain(stats.max.iter_mut()) {
                    *v = round2(*v);
                }
            }
        }
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

fn estimate_size(data: &JobData) -> usize {
    data.metrics
        .values()
        .flat_map(|by_scope| by_scope.values())
        .flat_map(|m| m.series.iter())
        .map(|s| s.data.len() * std::mem::size_of::<f32>())
        .sum::<usize>()
        .max(1)
}
