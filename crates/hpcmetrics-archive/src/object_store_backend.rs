// SPDX-License-Identifier: Apache-2.0

//! Filesystem and object-store archive backends, unified behind `object_store::ObjectStore`.

use std::io::{Read, Write};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};

use crate::backend::{ArchiveBackend, ArchiveInfo, CleanRange, IterOptions};
use crate::entry::ArchiveEntry;
use crate::error::ArchiveError;
use crate::meta::JobMeta;
use crate::path::{cluster_cfg_path, data_path, job_prefix, meta_path};

const WATERMARK_PATH: &str = "_compress_watermark";

/// Archive backend over any `object_store::ObjectStore` implementation: a local directory tree
/// via `LocalFileSystem`, or a remote object store configured from storage settings, following
/// the same construction pattern as cloud exporters elsewhere in this codebase.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBackend {
    /// Wraps an already-constructed `ObjectStore` implementation.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        ObjectStoreBackend { store }
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let result = self.store.get(&ObjectPath::from(path)).await?;
        let bytes = result.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn put_bytes(&self, path: &str, bytes: Vec<u8>) -> Result<(), ArchiveError> {
        let _ = self
            .store
            .put(&ObjectPath::from(path), PutPayload::from(bytes))
            .await?;
        Ok(())
    }

    async fn load_data_document(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<Vec<u8>, ArchiveError> {
        let compressed = data_path(cluster, job_id, start_time, true);
        if let Ok(raw) = self.get_bytes(&compressed).await {
            let mut decoder = GzDecoder::new(raw.as_slice());
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            return Ok(out);
        }
        self.get_bytes(&data_path(cluster, job_id, start_time, false)).await
    }
}

#[async_trait]
impl ArchiveBackend for ObjectStoreBackend {
    async fn import_job(&self, entry: &ArchiveEntry) -> Result<(), ArchiveError> {
        let meta_bytes = serde_json::to_vec_pretty(&entry.meta)?;
        let data_bytes = serde_json::to_vec(&entry.data)?;
        self.put_bytes(&meta_path(&entry.meta.cluster, entry.meta.job_id, entry.meta.start_time), meta_bytes)
            .await?;
        self.put_bytes(
            &data_path(&entry.meta.cluster, entry.meta.job_id, entry.meta.start_time, false),
            data_bytes,
        )
        .await
    }

    async fn load_job_meta(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<JobMeta, ArchiveError> {
        let bytes = self.get_bytes(&meta_path(cluster, job_id, start_time)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn load_job_data(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<ArchiveEntry, ArchiveError> {
        let meta = self.load_job_meta(cluster, job_id, start_time).await?;
        let data_bytes = self.load_data_document(cluster, job_id, start_time).await?;
        let data = serde_json::from_slice(&data_bytes)?;
        Ok(ArchiveEntry { meta, data })
    }

    fn iter(&self, options: IterOptions) -> BoxStream<'_, Result<ArchiveEntry, ArchiveError>> {
        let listing = self.store.list(None);
        let metas: BoxStream<'_, Result<ObjectPath, ArchiveError>> = listing
            .map_err(ArchiveError::from)
            .try_filter_map(|meta| async move {
                if meta.location.as_ref().ends_with("meta.json") {
                    Ok(Some(meta.location))
                } else {
                    Ok(None)
                }
            })
            .boxed();

        metas
            .and_then(move |location| async move {
                let bytes = self.get_bytes(location.as_ref()).await?;
                let meta: JobMeta = serde_json::from_slice(&bytes)?;
                let data = if options.load_metric_data {
                    let data_bytes = self
                        .load_data_document(&meta.cluster, meta.job_id, meta.start_time)
                        .await?;
                    serde_json::from_slice(&data_bytes)?
                } else {
                    hpcmetrics_store::JobData::default()
                };
                Ok(ArchiveEntry { meta, data })
            })
            .boxed()
    }

    async fn compress(&self, jobs: &[(String, u64, i64)]) -> Result<(), ArchiveError> {
        for (cluster, job_id, start_time) in jobs {
            let uncompressed = data_path(cluster, *job_id, *start_time, false);
            let raw = match self.get_bytes(&uncompressed).await {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&raw)?;
            let compressed = encoder.finish()?;
            self.put_bytes(&data_path(cluster, *job_id, *start_time, true), compressed)
                .await?;
            self.store.delete(&ObjectPath::from(uncompressed)).await?;
        }
        Ok(())
    }

    async fn compress_last(&self, before: i64) -> Result<u64, ArchiveError> {
        let watermark = self
            .get_bytes(WATERMARK_PATH)
            .await
            .ok()
            .and_then(|b| std::str::from_utf8(&b).ok().and_then(|s| s.parse::<i64>().ok()))
            .unwrap_or(0);

        let mut to_compress = Vec::new();
        let mut newest = watermark;
        let mut stream = self.iter(IterOptions { load_metric_data: false });
        while let Some(entry) = stream.next().await {
            let entry = entry?;
            if entry.meta.start_time > watermark && entry.meta.start_time < before {
                newest = newest.max(entry.meta.start_time);
                to_compress.push((entry.meta.cluster, entry.meta.job_id, entry.meta.start_time));
            }
        }
        let count = to_compress.len() as u64;
        self.compress(&to_compress).await?;
        self.put_bytes(WATERMARK_PATH, newest.to_string().into_bytes()).await?;
        Ok(count)
    }

    async fn clean(&self, range: CleanRange) -> Result<u64, ArchiveError> {
        let mut deleted = 0u64;
        let mut entries = self.iter(IterOptions { load_metric_data: false });
        let mut to_delete = Vec::new();
        while let Some(entry) = entries.next().await {
            let entry = entry?;
            if range.omit_tagged && entry.meta.tagged {
                continue;
            }
            if entry.meta.start_time < range.after || entry.meta.start_time > range.before {
                to_delete.push((entry.meta.cluster, entry.meta.job_id, entry.meta.start_time));
            }
        }
        for (cluster, job_id, start_time) in to_delete {
            let prefix = job_prefix(&cluster, job_id, start_time);
            for suffix in ["meta.json", "data.json", "data.json.gz"] {
                let path = format!("{prefix}/{suffix}");
                let _ = self.store.delete(&ObjectPath::from(path)).await;
            }
            deleted += 1;
        }
        Ok(deleted)
    }

    async fn info(&self) -> Result<ArchiveInfo, ArchiveError> {
        let mut job_count = 0u64;
        let mut total_bytes = 0u64;
        let mut listing = self.store.list(None);
        while let Some(meta) = listing.next().await {
            let meta = meta?;
            total_bytes += meta.size as u64;
            if meta.location.as_ref().ends_with("meta.json") {
                job_count += 1;
            }
        }
        Ok(ArchiveInfo { job_count, total_bytes })
    }

    async fn load_cluster_cfg(&self, cluster: &str) -> Result<Vec<u8>, ArchiveError> {
        self.get_bytes(&cluster_cfg_path(cluster)).await
    }

    async fn store_cluster_cfg(&self, cluster: &str, document: &[u8]) -> Result<(), ArchiveError> {
        self.put_bytes(&cluster_cfg_path(cluster), document.to_vec()).await
    }
}

/// Builds a `LocalFileSystem`-backed archive backend rooted at `root`, following the same
/// construction pattern as the object-store variant so both are interchangeable behind
/// [`ArchiveBackend`].
pub fn local_filesystem(root: &std::path::Path) -> Result<ObjectStoreBackend, ArchiveError> {
    let fs = object_store::local::LocalFileSystem::new_with_prefix(root)
        .map_err(|e| ArchiveError::Storage(Box::new(e)))?;
    Ok(ObjectStoreBackend::new(Arc::new(fs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcmetrics_store::JobData;

    fn sample_entry(job_id: u64, start_time: i64) -> ArchiveEntry {
        ArchiveEntry {
            meta: JobMeta {
                cluster: "fritz".into(),
                job_id,
                start_time,
                duration: Some(120),
                state: "completed".into(),
                monitoring_status: crate::meta::MonitoringStatus::ArchivingSuccessful,
                footprint: std::collections::HashMap::new(),
                energy: None,
                resources: vec!["fritz0001".into()],
                tagged: false,
            },
            data: JobData::default(),
        }
    }

    #[tokio::test]
    async fn round_trips_through_a_temp_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = local_filesystem(dir.path()).expect("backend");
        let entry = sample_entry(42, 1_700_000_000);
        backend.import_job(&entry).await.expect("import");

        let loaded = backend.load_job_data("fritz", 42, 1_700_000_000).await.expect("load");
        assert_eq!(loaded.meta.job_id, 42);
    }

    #[tokio::test]
    async fn compress_replaces_plain_document_with_gzip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = local_filesystem(dir.path()).expect("backend");
        let entry = sample_entry(7, 1_700_000_100);
        backend.import_job(&entry).await.expect("import");

        backend
            .compress(&[("fritz".to_owned(), 7, 1_700_000_100)])
            .await
            .expect("compress");

        let loaded = backend.load_job_data("fritz", 7, 1_700_000_100).await.expect("load after compress");
        assert_eq!(loaded.meta.job_id, 7);
    }

    #[tokio::test]
    async fn clean_removes_entries_outside_range() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = local_filesystem(dir.path()).expect("backend");
        backend.import_job(&sample_entry(1, 100)).await.expect("import old");
        backend.import_job(&sample_entry(2, 2_000)).await.expect("import new");

        let deleted = backend
            .clean(CleanRange { before: 1_000, after: 0, omit_tagged: false })
            .await
            .expect("clean");
        assert_eq!(deleted, 1);
        assert!(backend.load_job_meta("fritz", 1, 100).await.is_err());
        assert!(backend.load_job_meta("fritz", 2, 2_000).await.is_ok());
    }
}
