// SPDX-License-Identifier: Apache-2.0

//! `workers.*`: cron-style intervals for the periodic background jobs that reconcile job rows
//! against the scheduler and the archive.

use serde::{Deserialize, Serialize};

/// `workers.commit-job-worker` / `duration-worker` / `footprint-worker` intervals, given as cron
/// expressions understood by the worker scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct WorkersConfig {
    /// How often newly-submitted jobs are committed from the scheduler adapter into the job
    /// repository.
    #[serde(default = "default_commit_job_worker")]
    pub commit_job_worker: String,
    /// How often running jobs' walltime/duration is refreshed.
    #[serde(default = "default_duration_worker")]
    pub duration_worker: String,
    /// How often a job's energy/footprint aggregate is recomputed while it is running.
    #[serde(default = "default_footprint_worker")]
    pub footprint_worker: String,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        WorkersConfig {
            commit_job_worker: default_commit_job_worker(),
            duration_worker: default_duration_worker(),
            footprint_worker: default_footprint_worker(),
        }
    }
}

fn default_commit_job_worker() -> String {
    "0 * * * * *".to_owned()
}

fn default_duration_worker() -> String {
    "0 */5 * * * *".to_owned()
}

fn default_footprint_worker() -> String {
    "0 */10 * * * *".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_well_formed_cron_expressions() {
        let cfg = WorkersConfig::default();
        assert_eq!(cfg.commit_job_worker.split_whitespace().count(), 6);
        assert_eq!(cfg.duration_worker.split_whitespace().count(), 6);
        assert_eq!(cfg.footprint_worker.split_whitespace().count(), 6);
    }
}
