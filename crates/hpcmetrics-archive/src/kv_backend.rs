// SPDX-License-Identifier: Apache-2.0

//! Embedded key-value archive backend, backed by `sled`, keyed by the same path strings used for
//! addressing in the filesystem and object-store variants.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::backend::{ArchiveBackend, ArchiveInfo, CleanRange, IterOptions};
use crate::entry::ArchiveEntry;
use crate::error::ArchiveError;
use crate::meta::JobMeta;
use crate::path::{cluster_cfg_path, data_path, meta_path};

const WATERMARK_KEY: &str = "_compress_watermark";

/// Archive backend over an embedded `sled` database. Unlike the filesystem/object-store variant,
/// this one is a single flat keyspace rather than a hierarchical store, so `iter` scans the whole
/// tree filtering for `meta.json` suffixes rather than listing directories.
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    /// Opens (or creates) a sled database at `path`.
    pub fn open(path: &std::path::Path) -> Result<Self, ArchiveError> {
        Ok(SledBackend { db: sled::open(path)? })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        self.db
            .get(key)?
            .map(|ivec| ivec.to_vec())
            .ok_or_else(|| ArchiveError::NotFound(key.to_owned()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), ArchiveError> {
        let _ = self.db.insert(key, value)?;
        Ok(())
    }
}

#[async_trait]
impl ArchiveBackend for SledBackend {
    async fn import_job(&self, entry: &ArchiveEntry) -> Result<(), ArchiveError> {
        let meta_bytes = serde_json::to_vec(&entry.meta)?;
        let data_bytes = serde_json::to_vec(&entry.data)?;
        self.put(&meta_path(&entry.meta.cluster, entry.meta.job_id, entry.meta.start_time), meta_bytes)?;
        self.put(
            &data_path(&entry.meta.cluster, entry.meta.job_id, entry.meta.start_time, false),
            data_bytes,
        )
    }

    async fn load_job_meta(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<JobMeta, ArchiveError> {
        let bytes = self.get(&meta_path(cluster, job_id, start_time))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn load_job_data(&self, cluster: &str, job_id: u64, start_time: i64) -> Result<ArchiveEntry, ArchiveError> {
        let meta = self.load_job_meta(cluster, job_id, start_time).await?;
        let compressed = data_path(cluster, job_id, start_time, true);
        let raw = match self.get(&compressed) {
            Ok(bytes) => {
                use std::io::Read;
                let mut decoder = flate2::read::GzDecoder::new(bytes.as_slice());
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                out
            }
            Err(_) => self.get(&data_path(cluster, job_id, start_time, false))?,
        };
        let data = serde_json::from_slice(&raw)?;
        Ok(ArchiveEntry { meta, data })
    }

    fn iter(&self, options: IterOptions) -> BoxStream<'_, Result<ArchiveEntry, ArchiveError>> {
        let entries: Vec<(sled::IVec, sled::IVec)> = self.db.iter().filter_map(Result::ok).collect();
        let metas: Vec<JobMeta> = entries
            .into_iter()
            .filter(|(k, _)| k.ends_with(b"meta.json"))
            .filter_map(|(_, v)| serde_json::from_slice::<JobMeta>(&v).ok())
            .collect();

        futures::stream::iter(metas)
            .then(move |meta| async move {
                let data = if options.load_metric_data {
                    self.load_job_data(&meta.cluster, meta.job_id, meta.start_time)
                        .await?
                        .data
                } else {
                    hpcmetrics_store::JobData::default()
                };
                Ok(ArchiveEntry { meta, data })
            })
            .boxed()
    }

    async fn compress(&self, jobs: &[(String, u64, i64)]) -> Result<(), ArchiveError> {
        for (cluster, job_id, start_time) in jobs {
            let uncompressed_key = data_path(cluster, *job_id, *start_time, false);
            let Ok(raw) = self.get(&uncompressed_key) else { continue };
            use std::io::Write;
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&raw)?;
            let compressed = encoder.finish()?;
            self.put(&data_path(cluster, *job_id, *start_time, true), compressed)?;
            let _ = self.db.remove(&uncompressed_key)?;
        }
        Ok(())
    }

    async fn compress_last(&self, before: i64) -> Result<u64, ArchiveError> {
        let watermark = self
            .get(WATERMARK_KEY)
            .ok()
            .and_then(|b| std::str::from_utf8(&b).ok().and_then(|s| s.parse::<i64>().ok()))
            .unwrap_or(0);

        let mut stream = self.iter(IterOptions { load_metric_data: false });
        let mut to_compress = Vec::new();
        let mut newest = watermark;
        while let Some(entry) = stream.next().await {
            let entry = entry?;
            if entry.meta.start_time > watermark && entry.meta.start_time < before {
                newest = newest.max(entry.meta.start_time);
                to_compress.push((entry.meta.cluster, entry.meta.job_id, entry.meta.start_time));
            }
        }
        let count = to_compress.len() as u64;
        self.compress(&to_compress).await?;
        self.put(WATERMARK_KEY, newest.to_string().into_bytes())?;
        Ok(count)
    }

    async fn clean(&self, range: CleanRange) -> Result<u64, ArchiveError> {
        let mut stream = self.iter(IterOptions { load_metric_data: false });
        let mut to_delete = Vec::new();
        while let Some(entry) = stream.next().await {
            let entry = entry?;
            if range.omit_tagged && entry.meta.tagged {
                continue;
            }
            if entry.meta.start_time < range.after || entry.meta.start_time > range.before {
                to_delete.push((entry.meta.cluster, entry.meta.job_id, entry.meta.start_time));
            }
        }
        let deleted = to_delete.len() as u64;
        for (cluster, job_id, start_time) in to_delete {
            let _ = self.db.remove(meta_path(&cluster, job_id, start_time))?;
            let _ = self.db.remove(data_path(&cluster, job_id, start_time, false))?;
            let _ = self.db.remove(data_path(&cluster, job_id, start_time, true))?;
        }
        Ok(deleted)
    }

    async fn info(&self) -> Result<ArchiveInfo, ArchiveError> {
        let job_count = self
            .db
            .iter()
            .filter_map(Result::ok)
            .filter(|(k, _)| k.ends_with(b"meta.json"))
            .count() as u64;
        Ok(ArchiveInfo { job_count, total_bytes: self.db.size_on_disk().unwrap_or(0) })
    }

    async fn load_cluster_cfg(&self, cluster: &str) -> Result<Vec<u8>, ArchiveError> {
        self.get(&cluster_cfg_path(cluster))
    }

    async fn store_cluster_cfg(&self, cluster: &str, document: &[u8]) -> Result<(), ArchiveError> {
        self.put(&cluster_cfg_path(cluster), document.to_vec())
    }
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
                duration: Some(60),
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
    async fn round_trips_through_sled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = SledBackend::open(dir.path()).expect("open");
        backend.import_job(&sample_entry(1, 1_000)).await.expect("import");
        let loaded = backend.load_job_data("fritz", 1, 1_000).await.expect("load");
        assert_eq!(loaded.meta.job_id, 1);
    }

    #[tokio::test]
    async fn clean_respects_tagged_exemption() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = SledBackend::open(dir.path()).expect("open");
        let mut tagged = sample_entry(2, 500);
        tagged.meta.tagged = true;
        backend.import_job(&tagged).await.expect("import tagged");

        let deleted = backend
            .clean(CleanRange { before: 10_000, after: 1_000, omit_tagged: true })
            .await
            .expect("clean");
        assert_eq!(deleted, 0);
        assert!(backend.load_job_meta("fritz", 2, 500).await.is_ok());
    }
}
