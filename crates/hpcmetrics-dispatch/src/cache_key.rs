// SPDX-License-Identifier: Apache-2.0

//! The dispatcher's result-cache key and TTL policy.

use std::time::Duration;

use hpcmetrics_archive::MonitoringStatus;

/// TTL applied to cached results for jobs still running or being archived.
pub const RUNNING_TTL: Duration = Duration::from_secs(2 * 60);

/// TTL applied to cached results for jobs whose archival has settled.
pub const COMPLETED_TTL: Duration = Duration::from_secs(5 * 60 * 60);

/// Key for the dispatcher's result cache.
///
/// Deliberately excludes duration and start-time: state transitions (which change the key, since
/// `state` is part of it) together with TTL expiry are sufficient to invalidate stale entries
/// without tracking every mutable job field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    /// Job id the cached result belongs to.
    pub job_id: u64,
    /// Lifecycle state at the time of computation; a transition changes this and therefore the
    /// key, naturally invalidating the old entry.
    pub state: MonitoringStatus,
    /// Requested metric names, sorted so key equality does not depend on request order.
    pub metrics: Vec<String>,
    /// Requested scopes, sorted likewise.
    pub scopes: Vec<String>,
    /// Requested resampling resolution, `0` for "no resampling".
    pub resolution: u32,
}

impl DispatchKey {
    /// Builds a key, normalising metric and scope order so equivalent requests collapse to the
    /// same cache entry.
    #[must_use]
    pub fn new(
        job_id: u64,
        state: MonitoringStatus,
        mut metrics: Vec<String>,
        mut scopes: Vec<String>,
        resolution: u32,
    ) -> Self {
        metrics.sort_unstable();
        scopes.sort_unstable();
        DispatchKey { job_id, state, metrics, scopes, resolution }
    }

    /// The TTL this key's entry should be cached for.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        match self.state {
            MonitoringStatus::RunningOrArchiving | MonitoringStatus::Archiving => RUNNING_TTL,
            MonitoringStatus::ArchivingSuccessful
            | MonitoringStatus::ArchivingFailed
            | MonitoringStatus::Disabled => COMPLETED_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_order_does_not_affect_key_equality() {
        let a = DispatchKey::new(
            1,
            MonitoringStatus::ArchivingSuccessful,
            vec!["b".into(), "a".into()],
            vec!["node".into()],
            0,
        );
        let b = DispatchKey::new(
            1,
            MonitoringStatus::ArchivingSuccessful,
            vec!["a".into(), "b".into()],
            vec!["node".into()],
            0,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn running_jobs_get_the_short_ttl() {
        let key = DispatchKey::new(1, MonitoringStatus::RunningOrArchiving, vec![], vec![], 0);
        assert_eq!(key.ttl(), RUNNING_TTL);
    }
}
