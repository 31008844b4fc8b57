// SPDX-License-Identifier: Apache-2.0

//! The per-job archiving algorithm: re-fetch metadata, decide the scope set, pull data at the
//! highest native resolution, compute per-metric footprint statistics, persist, and commit.

use hpcmetrics_archive::{ArchiveBackend, ArchiveEntry, MonitoringStatus};
use hpcmetrics_dispatch::{JobRef, MetricDispatcher};
use hpcmetrics_repo::{JobRepository, JobUpdate};
use hpcmetrics_store::Scope;
use hpcmetrics_telemetry::SelfMetrics;
use tokio_util::sync::CancellationToken;

use crate::job::ArchiveJob;
use crate::options::StopHook;

/// Nodes allocated at or below which a job's core-scope series are archived too, capping the
/// volume archived for large jobs.
const CORE_SCOPE_NODE_LIMIT: usize = 8;

/// Decrements the pending-jobs gauge exactly once when a job finishes, on every exit path —
/// success, any of the early `return`s on failure, or a panic unwinding through this frame.
/// `trigger_archiving` increments the gauge before queuing; this guard is the only place that
/// decrements it, so every path through `archive_one` finishes the job's accounting.
struct PendingGuard<'a> {
    telemetry: &'a SelfMetrics,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.telemetry.archiver_pending.dec();
    }
}

/// Runs the full per-job archiving algorithm described in the module-level docs of
/// `hpcmetrics_archiver::lib`. Never returns an error: every failure is recorded on the job row
/// itself and logged, matching the no-automatic-retry failure model.
pub(crate) async fn archive_one(
    job: &ArchiveJob,
    job_repository: &dyn JobRepository,
    dispatcher: &MetricDispatcher,
    archive: &dyn ArchiveBackend,
    archive_disabled: bool,
    metrics: &[String],
    stop_hooks: &[StopHook],
    telemetry: &SelfMetrics,
    cancel: &CancellationToken,
) {
    let _pending_guard = PendingGuard { telemetry };

    let meta = match job_repository.find(&job.cluster, job.job_id, job.start_time).await {
        Ok(meta) => meta,
        Err(err) => {
            tracing::warn!(
                cluster = %job.cluster,
                job_id = job.job_id,
                error = %err,
                "failed to re-fetch job metadata, marking archiving-failed"
            );
            mark_failed(job_repository, job).await;
            return;
        }
    };

    let mut scopes = vec![Scope::Node];
    if job.num_nodes() <= CORE_SCOPE_NODE_LIMIT {
        scopes.push(Scope::Core);
    }
    if job.has_accelerators {
        scopes.push(Scope::Accelerator);
    }

    let job_ref = JobRef {
        cluster: job.cluster.clone(),
        job_id: job.job_id,
        start_time: job.start_time,
        monitoring_status: MonitoringStatus::Archiving,
        running: true,
        resources: job.resources.clone(),
    };

    let data = match dispatcher.load_data(&job_ref, metrics, &scopes, 0, cancel).await {
        Ok(data) => (*data).clone(),
        Err(err) => {
            tracing::warn!(cluster = %job.cluster, job_id = job.job_id, error = %err, "failed to load job data for archiving");
            mark_failed(job_repository, job).await;
            return;
        }
    };

    let footprint = match dispatcher.load_job_stats(&job_ref, metrics, cancel).await {
        Ok(stats) => stats.into_iter().map(|(metric, stat)| (metric, stat.avg)).collect(),
        Err(err) => {
            tracing::warn!(cluster = %job.cluster, job_id = job.job_id, error = %err, "failed to compute job footprint");
            mark_failed(job_repository, job).await;
            return;
        }
    };

    let mut persisted_meta = meta.clone();
    persisted_meta.footprint.clone_from(&footprint);
    persisted_meta.monitoring_status = MonitoringStatus::ArchivingSuccessful;

    if !archive_disabled {
        if let Err(err) = archive.import_job(&ArchiveEntry { meta: persisted_meta.clone(), data }).await {
            tracing::warn!(cluster = %job.cluster, job_id = job.job_id, error = %err, "failed to persist archived job");
            mark_failed(job_repository, job).await;
            return;
        }
    }

    commit(job_repository, job, &footprint, meta.energy).await;

    for hook in stop_hooks {
        hook(&persisted_meta);
    }
}

async fn commit(job_repository: &dyn JobRepository, job: &ArchiveJob, footprint: &std::collections::HashMap<String, f64>, energy: Option<f64>) {
    let update = JobUpdate {
        footprint: Some(footprint.clone()),
        monitoring_status: Some(MonitoringStatus::ArchivingSuccessful),
        duration: None,
        energy,
    };
    if let Err(err) = job_repository.transaction(&job.cluster, job.job_id, job.start_time, update).await {
        tracing::error!(cluster = %job.cluster, job_id = job.job_id, error = %err, "failed to commit archived job record");
    }
}

async fn mark_failed(job_repository: &dyn JobRepository, job: &ArchiveJob) {
    if let Err(err) =
        job_repository.update_monitoring_status(&job.cluster, job.job_id, job.start_time, MonitoringStatus::ArchivingFailed).await
    {
        tracing::error!(cluster = %job.cluster, job_id = job.job_id, error = %err, "failed to record archiving-failed status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hpcmetrics_archive::{ArchiveError, ArchiveInfo, CleanRange, IterOptions, JobMeta};
    use hpcmetrics_repo::RepoError;
    use hpcmetrics_store::MetricStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    struct FakeRepo {
        meta: JobMeta,
        committed: StdMutex<Option<JobUpdate>>,
        failed: AtomicBool,
        fail_find: bool,
    }

    #[async_trait]
    impl JobRepository for FakeRepo {
        async fn find(&self, _: &str, _: u64, _: i64) -> Result<JobMeta, RepoError> {
            if self.fail_find {
                return Err(RepoError::NotFound("missing".into()));
            }
            Ok(self.meta.clone())
        }
        async fn update_footprint(&self, _: &str, _: u64, _: i64, _: HashMap<String, f64>) -> Result<(), RepoError> {
            Ok(())
        }
        async fn update_monitoring_status(&self, _: &str, _: u64, _: i64, _: MonitoringStatus) -> Result<(), RepoError> {
            self.failed.store(true, Ordering::SeqCst);
            Ok(())
        }
        async fn transaction(&self, _: &str, _: u64, _: i64, update: JobUpdate) -> Result<(), RepoError> {
            *self.committed.lock().expect("lock") = Some(update);
            Ok(())
        }
    }

    struct EmptyArchive;

    #[async_trait]
    impl ArchiveBackend for EmptyArchive {
        async fn import_job(&self, _: &ArchiveEntry) -> Result<(), ArchiveError> {
            Ok(())
        }
        async fn load_job_meta(&self, _: &str, _: u64, _: i64) -> Result<JobMeta, ArchiveError> {
            Err(ArchiveError::NotFound("test".into()))
        }
        async fn load_job_data(&self, _: &str, _: u64, _: i64) -> Result<ArchiveEntry, ArchiveError> {
            Err(ArchiveError::NotFound("test".into()))
        }
        fn iter(&self, _: IterOptions) -> futures::stream::BoxStream<'_, Result<ArchiveEntry, ArchiveError>> {
            Box::pin(futures::stream::empty())
        }
        async fn compress(&self, _: &[(String, u64, i64)]) -> Result<(), ArchiveError> {
            Ok(())
        }
        async fn compress_last(&self, _: i64) -> Result<u64, ArchiveError> {
            Ok(0)
        }
        async fn clean(&self, _: CleanRange) -> Result<u64, ArchiveError> {
            Ok(0)
        }
        async fn info(&self) -> Result<ArchiveInfo, ArchiveError> {
            Ok(ArchiveInfo::default())
        }
        async fn load_cluster_cfg(&self, _: &str) -> Result<Vec<u8>, ArchiveError> {
            Err(ArchiveError::NotFound("test".into()))
        }
        async fn store_cluster_cfg(&self, _: &str, _: &[u8]) -> Result<(), ArchiveError> {
            Ok(())
        }
    }

    fn test_meta() -> JobMeta {
        JobMeta {
            cluster: "fritz".into(),
            job_id: 1,
            start_time: 0,
            duration: Some(3600),
            state: "completed".into(),
            monitoring_status: MonitoringStatus::Archiving,
            footprint: HashMap::new(),
            energy: Some(12.5),
            resources: vec!["fritz0001".into()],
            tagged: false,
        }
    }

    #[tokio::test]
    async fn missing_job_record_marks_archiving_failed() {
        let repo = FakeRepo { meta: test_meta(), committed: StdMutex::new(None), failed: AtomicBool::new(false), fail_find: true };
        let store = Arc::new(MetricStore::new());
        let dispatcher = MetricDispatcher::new(store, Arc::new(EmptyArchive), 1 << 20, true);
        let telemetry = SelfMetrics::new().expect("metrics should build");
        telemetry.archiver_pending.inc();
        let cancel = CancellationToken::new();
        let job = ArchiveJob { cluster: "fritz".into(), job_id: 1, start_time: 0, resources: vec!["fritz0001".into()], has_accelerators: false };

        archive_one(&job, &repo, &dispatcher, &EmptyArchive, false, &[], &[], &telemetry, &cancel).await;

        assert!(repo.failed.load(Ordering::SeqCst));
        assert_eq!(telemetry.archiver_pending.get(), 0, "a failed archive must still decrement the pending gauge");
    }

    #[tokio::test]
    async fn failed_persistence_still_decrements_pending_gauge() {
        struct FailingArchive;

        #[async_trait]
        impl ArchiveBackend for FailingArchive {
            async fn import_job(&self, _: &ArchiveEntry) -> Result<(), ArchiveError> {
                Err(ArchiveError::NotFound("write failed".into()))
            }
            async fn load_job_meta(&self, _: &str, _: u64, _: i64) -> Result<JobMeta, ArchiveError> {
                Err(ArchiveError::NotFound("test".into()))
            }
            async fn load_job_data(&self, _: &str, _: u64, _: i64) -> Result<ArchiveEntry, ArchiveError> {
                Err(ArchiveError::NotFound("test".into()))
            }
            fn iter(&self, _: IterOptions) -> futures::stream::BoxStream<'_, Result<ArchiveEntry, ArchiveError>> {
                Box::pin(futures::stream::empty())
            }
            async fn compress(&self, _: &[(String, u64, i64)]) -> Result<(), ArchiveError> {
                Ok(())
            }
            async fn compress_last(&self, _: i64) -> Result<u64, ArchiveError> {
                Ok(0)
            }
            async fn clean(&self, _: CleanRange) -> Result<u64, ArchiveError> {
                Ok(0)
            }
            async fn info(&self) -> Result<ArchiveInfo, ArchiveError> {
                Ok(ArchiveInfo::default())
            }
            async fn load_cluster_cfg(&self, _: &str) -> Result<Vec<u8>, ArchiveError> {
                Err(ArchiveError::NotFound("test".into()))
            }
            async fn store_cluster_cfg(&self, _: &str, _: &[u8]) -> Result<(), ArchiveError> {
                Ok(())
            }
        }

        let repo = FakeRepo { meta: test_meta(), committed: StdMutex::new(None), failed: AtomicBool::new(false), fail_find: false };
        let store = Arc::new(MetricStore::new());
        store.register_metric("flops_any", 10);
        store.write(&hpcmetrics_store::MetricPath::node("fritz", "fritz0001"), "flops_any", 0, 3.0).unwrap();
        let dispatcher = MetricDispatcher::new(store, Arc::new(EmptyArchive), 1 << 20, true);
        let telemetry = SelfMetrics::new().expect("metrics should build");
        telemetry.archiver_pending.inc();
        let cancel = CancellationToken::new();
        let job = ArchiveJob { cluster: "fritz".into(), job_id: 1, start_time: 0, resources: vec!["fritz0001".into()], has_accelerators: false };

        archive_one(&job, &repo, &dispatcher, &FailingArchive, false, &["flops_any".to_owned()], &[], &telemetry, &cancel).await;

        assert!(repo.failed.load(Ordering::SeqCst));
        assert_eq!(telemetry.archiver_pending.get(), 0, "a persistence failure must still decrement the pending gauge");
    }

    #[tokio::test]
    async fn successful_archive_commits_footprint_and_status() {
        let repo = FakeRepo { meta: test_meta(), committed: StdMutex::new(None), failed: AtomicBool::new(false), fail_find: false };
        let store = Arc::new(MetricStore::new());
        store.register_metric("flops_any", 10);
        store.write(&hpcmetrics_store::MetricPath::node("fritz", "fritz0001"), "flops_any", 0, 3.0).unwrap();
        let dispatcher = MetricDispatcher::new(store, Arc::new(EmptyArchive), 1 << 20, true);
        let telemetry = SelfMetrics::new().expect("metrics should build");
        telemetry.archiver_pending.inc();
        let cancel = CancellationToken::new();
        let job = ArchiveJob { cluster: "fritz".into(), job_id: 1, start_time: 0, resources: vec!["fritz0001".into()], has_accelerators: false };

        archive_one(&job, &repo, &dispatcher, &EmptyArchive, false, &["flops_any".to_owned()], &[], &telemetry, &cancel).await;

        let committed = repo.committed.lock().expect("lock").clone().expect("should have committed");
        assert_eq!(committed.monitoring_status, Some(MonitoringStatus::ArchivingSuccessful));
        assert_eq!(committed.footprint.as_ref().and_then(|f| f.get("flops_any")).copied(), Some(3.0));
        assert_eq!(telemetry.archiver_pending.get(), 0);
    }
}
