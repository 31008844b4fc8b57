// SPDX-License-Identifier: Apache-2.0

//! The capability set every archive backend variant implements.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::entry::ArchiveEntry;
use crate::error::ArchiveError;
use crate::meta::JobMeta;

/// Selects which rows of an iterated entry to populate; `Iter(false)` skips the (larger) metric
/// data document when only metadata is needed, e.g. for a `Clean` dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterOptions {
    /// Whether to load each entry's `data.json` alongside its `meta.json`.
    pub load_metric_data: bool,
}

/// Bound on how many jobs `Clean` may consider tagged-exempt before it refuses to run, a safety
/// rail against a misconfigured tag filter deleting everything.
pub const CLEAN_MAX_SCAN: usize = 10_000_000;

/// Parameters for [`ArchiveBackend::clean`].
#[derive(Debug, Clone, Copy)]
pub struct CleanRange {
    /// Delete entries with `startTime < before`.
    pub before: i64,
    /// Delete entries with `startTime >= after`.
    pub after: i64,
    /// Skip entries whose `JobMeta::tagged` is set.
    pub omit_tagged: bool,
}

/// Summary counters returned by [`ArchiveBackend::info`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveInfo {
    /// Total number of archived jobs.
    pub job_count: u64,
    /// Total bytes occupied by archived documents, where the backend can report it.
    pub total_bytes: u64,
}

/// The capability set a completed job's archived data and metadata can be stored to, read from,
/// iterated, cleaned and compressed through, independent of the underlying storage medium.
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    /// Writes both documents for a job, creating or overwriting its entry.
    async fn import_job(&self, entry: &ArchiveEntry) -> Result<(), ArchiveError>;

    /// Loads just the metadata document for a job.
    async fn load_job_meta(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<JobMeta, ArchiveError>;

    /// Loads both documents for a job.
    async fn load_job_data(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<ArchiveEntry, ArchiveError>;

    /// Streams every archived job as an ordered, restartable sequence. Implementations fan out
    /// internally (e.g. over cluster subdirectories or prefixes) but must deliver entries to the
    /// caller through a single ordered stream.
    fn iter(&self, options: IterOptions) -> BoxStream<'_, Result<ArchiveEntry, ArchiveError>>;

    /// Rewrites the data documents of `jobs` with gzip compression.
    async fn compress(&self, jobs: &[(String, u64, i64)]) -> Result<(), ArchiveError>;

    /// Compresses every uncompressed job older than `before`, recording a watermark so repeat
    /// calls only process newly archived jobs.
    async fn compress_last(&self, before: i64) -> Result<u64, ArchiveError>;

    /// Deletes entries whose `startTime` falls outside `[range.after, range.before]`, honouring
    /// `omit_tagged`. Returns the number of jobs deleted.
    async fn clean(&self, range: CleanRange) -> Result<u64, ArchiveError>;

    /// Summary counters for this backend.
    async fn info(&self) -> Result<ArchiveInfo, ArchiveError>;

    /// Loads a cluster's topology/configuration document.
    async fn load_cluster_cfg(&self, cluster: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Persists a cluster's topology/configuration document.
    async fn store_cluster_cfg(&self, cluster: &str, document: &[u8]) -> Result<(), ArchiveError>;
}
