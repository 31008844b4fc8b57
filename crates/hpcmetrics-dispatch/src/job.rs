// SPDX-License-Identifier: Apache-2.0

//! The subset of job identity and lifecycle state the dispatcher needs to route a request.

use hpcmetrics_archive::MonitoringStatus;

/// Identifies a job and carries just enough lifecycle state to decide whether `load_data` should
/// read from the live store or from the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobRef {
    /// Cluster name.
    pub cluster: String,
    /// Numeric job id.
    pub job_id: u64,
    /// Unix-seconds start time, part of this job's archive address.
    pub start_time: i64,
    /// Archival lifecycle state.
    pub monitoring_status: MonitoringStatus,
    /// Whether the scheduler still reports this job as running.
    pub running: bool,
    /// Hostnames of nodes allocated to this job.
    pub resources: Vec<String>,
}

impl JobRef {
    /// True when reads should go to the metric store rather than the archive: the job is
    /// running, its monitoring status is `running-or-archiving`, or archiving is globally
    /// disabled (represented here by `archive_enabled = false`).
    #[must_use]
    pub fn should_read_live(&self, archive_enabled: bool) -> bool {
        !archive_enabled
            || self.running
            || self.monitoring_status == MonitoringStatus::RunningOrArchiving
    }
}
