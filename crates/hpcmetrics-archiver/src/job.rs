// SPDX-License-Identifier: Apache-2.0

//! The payload `trigger_archiving` enqueues: just enough to re-fetch the full job record and
//! decide which scopes to archive.

/// A job handed to the archiver once a scheduler marks it finished.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    /// Cluster the job ran on.
    pub cluster: String,
    /// Numeric job id.
    pub job_id: u64,
    /// Unix-seconds start time, part of the job's archive address.
    pub start_time: i64,
    /// Hostnames of nodes allocated to the job.
    pub resources: Vec<String>,
    /// Whether the scheduler reported any accelerator allocated to this job. Not derivable from
    /// the job record alone, so it travels with the trigger.
    pub has_accelerators: bool,
}

impl ArchiveJob {
    /// Number of nodes allocated, used by the core-scope archiving heuristic.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.resources.len()
    }
}
