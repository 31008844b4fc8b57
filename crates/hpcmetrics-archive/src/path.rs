// SPDX-License-Identifier: Apache-2.0

//! The content-addressed path scheme shared by every backend.

/// Builds the directory/prefix address for a job: `cluster/(jobId/1000)/(jobId%1000,3-digit)/startTime/`.
#[must_use]
pub fn job_prefix(cluster: &str, job_id: u64, start_time: i64) -> String {
    format!("{cluster}/{}/{:03}/{start_time}", job_id / 1000, job_id % 1000)
}

/// Path to a job's metadata document.
#[must_use]
pub fn meta_path(cluster: &str, job_id: u64, start_time: i64) -> String {
    format!("{}/meta.json", job_prefix(cluster, job_id, start_time))
}

/// Path to a job's metric-data document, with or without gzip compression.
#[must_use]
pub fn data_path(cluster: &str, job_id: u64, start_time: i64, compressed: bool) -> String {
    let base = job_prefix(cluster, job_id, start_time);
    if compressed {
        format!("{base}/data.json.gz")
    } else {
        format!("{base}/data.json")
    }
}

/// Path to a cluster's topology/configuration document.
#[must_use]
pub fn cluster_cfg_path(cluster: &str) -> String {
    format!("{cluster}/cluster.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressing_matches_the_documented_scheme() {
        assert_eq!(job_prefix("fritz", 1234567, 1_700_000_000), "fritz/1234/567/1700000000");
        assert_eq!(job_prefix("fritz", 42, 1_700_000_000), "fritz/0/042/1700000000");
        assert_eq!(meta_path("fritz", 42, 1_700_000_000), "fritz/0/042/1700000000/meta.json");
        assert_eq!(
            data_path("fritz", 42, 1_700_000_000, true),
            "fritz/0/042/1700000000/data.json.gz"
        );
    }
}
