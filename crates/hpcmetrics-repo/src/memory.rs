// SPDX-License-Identifier: Apache-2.0

//! In-memory test doubles for the repository contracts.

use std::collections::HashMap;

use async_trait::async_trait;
use hpcmetrics_archive::JobMeta;
use parking_lot::Mutex;

use crate::{ClusterRecord, ClusterRepository, JobRepository, JobUpdate, RepoError};

fn job_key(cluster: &str, job_id: u64, start_time: i64) -> String {
    format!("{cluster}/{job_id}/{start_time}")
}

/// In-memory `JobRepository` test double, seeded directly by tests rather than a database.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<String, JobMeta>>,
}

impl InMemoryJobRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        InMemoryJobRepository::default()
    }

    /// Seeds a job record directly, bypassing the trait's update methods.
    pub fn seed(&self, meta: JobMeta) {
        let key = job_key(&meta.cluster, meta.job_id, meta.start_time);
        let _ = self.jobs.lock().insert(key, meta);
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn find(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<JobMeta, RepoError> {
        self.jobs
            .lock()
            .get(&job_key(cluster, job_id, start_time))
            .cloned()
            .ok_or_else(|| RepoError::NotFound(job_key(cluster, job_id, start_time)))
    }

    async fn update_footprint(
        &self,
        cluster: &str,
        job_id: u64,
        start_time: i64,
        footprint: HashMap<String, f64>,
    ) -> Result<(), RepoError> {
        let key = job_key(cluster, job_id, start_time);
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&key).ok_or_else(|| RepoError::NotFound(key.clone()))?;
        job.footprint = footprint;
        Ok(())
    }

    async fn update_monitoring_status(
        &self,
        cluster: &str,
        job_id: u64,
        start_time: i64,
        status: hpcmetrics_archive::MonitoringStatus,
    ) -> Result<(), RepoError> {
        let key = job_key(cluster, job_id, start_time);
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&key).ok_or_else(|| RepoError::NotFound(key.clone()))?;
        job.monitoring_status = status;
        Ok(())
    }

    async fn transaction(&self, cluster: &str, job_id: u64, start_time: i64, update: JobUpdate) -> Result<(), RepoError> {
        let key = job_key(cluster, job_id, start_time);
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&key).ok_or_else(|| RepoError::NotFound(key.clone()))?;
        if let Some(footprint) = update.footprint {
            job.footprint.extend(footprint);
        }
        if let Some(status) = update.monitoring_status {
            job.monitoring_status = status;
        }
        if let Some(duration) = update.duration {
            job.duration = Some(duration);
        }
        if let Some(energy) = update.energy {
            job.energy = Some(energy);
        }
        Ok(())
    }
}

/// In-memory `ClusterRepository` test double.
#[derive(Default)]
pub struct InMemoryClusterRepository {
    clusters: Mutex<HashMap<String, ClusterRecord>>,
}

impl InMemoryClusterRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        InMemoryClusterRepository::default()
    }

    /// Seeds a cluster record.
    pub fn seed(&self, record: ClusterRecord) {
        let _ = self.clusters.lock().insert(record.name.clone(), record);
    }
}

#[async_trait]
impl ClusterRepository for InMemoryClusterRepository {
    async fn get(&self, name: &str) -> Result<ClusterRecord, RepoError> {
        self.clusters
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(name.to_owned()))
    }

    async fn list(&self) -> Result<Vec<ClusterRecord>, RepoError> {
        Ok(self.clusters.lock().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcmetrics_archive::MonitoringStatus;

    fn sample() -> JobMeta {
        JobMeta {
            cluster: "fritz".into(),
            job_id: 1,
            start_time: 0,
            duration: None,
            state: "running".into(),
            monitoring_status: MonitoringStatus::RunningOrArchiving,
            footprint: HashMap::new(),
            energy: None,
            resources: vec!["fritz0001".into()],
            tagged: false,
        }
    }

    #[tokio::test]
    async fn find_returns_seeded_job() {
        let repo = InMemoryJobRepository::new();
        repo.seed(sample());
        let job = repo.find("fritz", 1, 0).await.unwrap();
        assert_eq!(job.job_id, 1);
    }

    #[tokio::test]
    async fn transaction_applies_every_field() {
        let repo = InMemoryJobRepository::new();
        repo.seed(sample());
        let mut footprint = HashMap::new();
        let _ = footprint.insert("flops_any".to_owned(), 42.0);
        repo.transaction(
            "fritz",
            1,
            0,
            JobUpdate {
                footprint: Some(footprint),
                monitoring_status: Some(MonitoringStatus::ArchivingSuccessful),
                duration: Some(120),
                energy: Some(10.0),
            },
        )
        .await
        .unwrap();

        let job = repo.find("fritz", 1, 0).await.unwrap();
        assert_eq!(job.monitoring_status, MonitoringStatus::ArchivingSuccessful);
        assert_eq!(job.duration, Some(120));
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let repo = InMemoryJobRepository::new();
        assert!(repo.find("fritz", 99, 0).await.is_err());
    }
}
