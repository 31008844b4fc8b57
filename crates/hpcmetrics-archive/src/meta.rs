// SPDX-License-Identifier: Apache-2.0

//! The non-metric half of an archived job: `meta.json`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Persisted lifecycle state of archival for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitoringStatus {
    /// Still running, or running and actively being monitored.
    RunningOrArchiving,
    /// Archival is in progress.
    Archiving,
    /// Archival completed successfully.
    ArchivingSuccessful,
    /// Archival failed; the job remains servable from the store if still resident.
    ArchivingFailed,
    /// Archival disabled for this job (e.g. by configuration).
    Disabled,
}

/// All non-metric fields of a job, plus statistics computed at archive time. Serialized as
/// `meta.json` alongside `data.json` for each [`super::entry::ArchiveEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMeta {
    /// Cluster name.
    pub cluster: String,
    /// Numeric job id, unique within the cluster.
    pub job_id: u64,
    /// Unix-seconds start time; also the last path segment of this job's archive address.
    pub start_time: i64,
    /// Duration in seconds, `None` while still running.
    pub duration: Option<u64>,
    /// Scheduler job state (e.g. `"completed"`, `"failed"`, `"cancelled"`).
    pub state: String,
    /// Archival lifecycle state.
    pub monitoring_status: MonitoringStatus,
    /// Per-metric summary statistic computed at archive time, e.g. average of averages.
    pub footprint: HashMap<String, f64>,
    /// Total energy consumed, in joules, if metered.
    pub energy: Option<f64>,
    /// Hostnames of nodes allocated to this job.
    pub resources: Vec<String>,
    /// Whether the job should be skipped by `Clean` when the omit-tagged flag is set.
    pub tagged: bool,
}
