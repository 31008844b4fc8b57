// SPDX-License-Identifier: Apache-2.0

//! Repository contracts consumed by SQL and GraphQL collaborators.
//!
//! Only the trait boundary and a simple in-memory test double are built here; a real SQL-backed
//! implementation is out of scope. The archiver and dispatcher are generic over `dyn JobRepository`
//! / `dyn ClusterRepository` so they can run against the test double in unit tests and a real
//! implementation in production, the same factory/registry seam the teacher uses elsewhere.

mod error;
mod memory;

pub use error::RepoError;
pub use memory::{InMemoryClusterRepository, InMemoryJobRepository};

use std::collections::HashMap;

use async_trait::async_trait;
use hpcmetrics_archive::{JobMeta, MonitoringStatus};

/// A single atomic multi-field update applied through [`JobRepository::transaction`].
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    /// New footprint entries to merge into the job's existing footprint map.
    pub footprint: Option<HashMap<String, f64>>,
    /// New monitoring status, if changing.
    pub monitoring_status: Option<MonitoringStatus>,
    /// New duration, if changing.
    pub duration: Option<u64>,
    /// New energy total, if changing.
    pub energy: Option<f64>,
}

/// Persistence contract for job records.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Looks up a job by cluster, id and start time.
    async fn find(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<JobMeta, RepoError>;

    /// Overwrites a job's footprint map.
    async fn update_footprint(&self, cluster: &str, job_id: u64, start_time: i64, footprint: HashMap<String, f64>) -> Result<(), RepoError>;

    /// Updates a job's monitoring status.
    async fn update_monitoring_status(&self, cluster: &str, job_id: u64, start_time: i64, status: MonitoringStatus) -> Result<(), RepoError>;

    /// Applies a multi-field update atomically.
    async fn transaction(&self, cluster: &str, job_id: u64, start_time: i64, update: JobUpdate) -> Result<(), RepoError>;
}

/// Minimal cluster topology record, as consumed by resolvers.
#[derive(Debug, Clone)]
pub struct ClusterRecord {
    /// Cluster name.
    pub name: String,
    /// Node-list expression covering the whole cluster.
    pub node_list: String,
}

/// Persistence contract for cluster topology records.
#[async_trait]
pub trait ClusterRepository: Send + Sync {
    /// Looks up a cluster by name.
    async fn get(&self, name: &str) -> Result<ClusterRecord, RepoError>;

    /// Lists every known cluster.
    async fn list(&self) -> Result<Vec<ClusterRecord>, RepoError>;
}
