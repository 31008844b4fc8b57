// SPDX-License-Identifier: Apache-2.0

//! A backend that refuses every operation, used when `archive.disabled = true` and no real
//! backend was configured. The dispatcher and archiver still hold a `dyn ArchiveBackend` handle
//! unconditionally; this variant exists so standing one up never depends on a path or bucket
//! being configured.
//!
//! Nothing should ever actually reach this backend: [`crate::backend::ArchiveBackend::iter`]
//! yields nothing, and every other call only fires on the archive read/write path, which routing
//! (`JobRef::should_read_live`, the archiver's `archive_disabled` flag) is supposed to bypass
//! whenever archiving is disabled.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};

use crate::backend::{ArchiveBackend, ArchiveInfo, CleanRange, IterOptions};
use crate::entry::ArchiveEntry;
use crate::error::ArchiveError;
use crate::meta::JobMeta;

/// See the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

#[async_trait]
impl ArchiveBackend for NullBackend {
    async fn import_job(&self, _entry: &ArchiveEntry) -> Result<(), ArchiveError> {
        Err(ArchiveError::NotFound("archiving is disabled".to_owned()))
    }

    async fn load_job_meta(&self, _cluster: &str, _job_id: u64, _start_time: i64) -> Result<JobMeta, ArchiveError> {
        Err(ArchiveError::NotFound("archiving is disabled".to_owned()))
    }

    async fn load_job_data(&self, _cluster: &str, _job_id: u64, _start_time: i64) -> Result<ArchiveEntry, ArchiveError> {
        Err(ArchiveError::NotFound("archiving is disabled".to_owned()))
    }

    fn iter(&self, _options: IterOptions) -> BoxStream<'_, Result<ArchiveEntry, ArchiveError>> {
        Box::pin(stream::empty())
    }

    async fn compress(&self, _jobs: &[(String, u64, i64)]) -> Result<(), ArchiveError> {
        Ok(())
    }

    async fn compress_last(&self, _before: i64) -> Result<u64, ArchiveError> {
        Ok(0)
    }

    async fn clean(&self, _range: CleanRange) -> Result<u64, ArchiveError> {
        Ok(0)
    }

    async fn info(&self) -> Result<ArchiveInfo, ArchiveError> {
        Ok(ArchiveInfo::default())
    }

    async fn load_cluster_cfg(&self, _cluster: &str) -> Result<Vec<u8>, ArchiveError> {
        Err(ArchiveError::NotFound("archiving is disabled".to_owned()))
    }

    async fn store_cluster_cfg(&self, _cluster: &str, _document: &[u8]) -> Result<(), ArchiveError> {
        Err(ArchiveError::NotFound("archiving is disabled".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn iter_yields_nothing() {
        let backend = NullBackend;
        let entries: Vec<_> = backend.iter(IterOptions { load_metric_data: false }).collect().await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn compress_and_clean_are_harmless_no_ops() {
        let backend = NullBackend;
        assert_eq!(backend.compress_last(0).await.unwrap(), 0);
        assert_eq!(backend.clean(CleanRange { before: 0, after: 0, omit_tagged: false }).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reads_and_writes_are_refused() {
        let backend = NullBackend;
        assert!(backend.load_job_meta("fritz", 1, 1).await.is_err());
    }
}
