// SPDX-License-Identifier: Apache-2.0

//! Archiver construction parameters.

use std::sync::Arc;

use hpcmetrics_archive::JobMeta;

/// Default bound on the trigger queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Called once a job has been successfully archived, after its row is committed. Typical uses:
/// notifying a message bus, invalidating a front-end cache entry.
pub type StopHook = Arc<dyn Fn(&JobMeta) + Send + Sync>;

/// Parameters for [`crate::Archiver::start`].
pub struct ArchiverOptions {
    /// Bound on the trigger channel; `trigger_archiving` blocks once this many jobs are queued.
    pub channel_capacity: usize,
    /// Metric names considered for archiving. In practice the cluster's full configured metric
    /// list; callers decide the scope set per job from `ArchiveJob::num_nodes`/`has_accelerators`.
    pub metrics: Vec<String>,
    /// Skips persistence through the archive backend when set; footprint/energy are still
    /// computed and committed to the job row. Mirrors `archive.disabled` in configuration.
    pub archive_disabled: bool,
    /// Hooks fired, in registration order, after a job is successfully archived.
    pub stop_hooks: Vec<StopHook>,
}

impl Default for ArchiverOptions {
    fn default() -> Self {
        ArchiverOptions {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            metrics: Vec::new(),
            archive_disabled: false,
            stop_hooks: Vec::new(),
        }
    }
}
