// SPDX-License-Identifier: Apache-2.0

//! `archive.*`: which `hpcmetrics-archive` backend is active and how to reach it.

use serde::{Deserialize, Serialize};

use crate::byte_units;

/// Archive backend selector. Each variant carries only the fields that backend needs; unrelated
/// fields from other variants are rejected by `deny_unknown_fields` on the enclosing config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ArchiveConfig {
    /// `fs`, `object-store`, or `embedded-kv`.
    pub kind: ArchiveKind,
    /// Local filesystem root (`fs`) or embedded-KV database file (`embedded-kv`).
    #[serde(default)]
    pub path: Option<String>,
    /// Object store bucket name (`object-store`).
    #[serde(default)]
    pub bucket: Option<String>,
    /// Object store endpoint override, for S3-compatible stores that are not AWS itself.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Object store region.
    #[serde(default)]
    pub region: Option<String>,
    /// Buffer size per upload part, for backends that stream multipart uploads.
    #[serde(default, deserialize_with = "byte_units::deserialize")]
    pub upload_buffer_size: Option<u32>,
    /// Disables archiving entirely; jobs are finalized without ever leaving the live store. Jobs
    /// are evicted from memory per the retention policy regardless.
    #[serde(default)]
    pub disabled: bool,
}

/// The backend `hpcmetrics-archive::ArchiveBackend` implementation this selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveKind {
    /// Plain files on a local/mounted filesystem, via `object_store::local::LocalFileSystem`.
    Fs,
    /// A genuine object store (S3, GCS, Azure Blob), via the `object_store` crate.
    ObjectStore,
    /// A single embedded key-value database file, via `sled`.
    EmbeddedKv,
}

impl ArchiveConfig {
    /// Validates that the fields present match what `kind` requires.
    ///
    /// # Errors
    ///
    /// Returns a list of human-readable problems; empty if the configuration is consistent.
    #[must_use]
    pub fn check(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.disabled {
            return errors;
        }
        match self.kind {
            ArchiveKind::Fs | ArchiveKind::EmbeddedKv => {
                if self.path.is_none() {
                    errors.push(format!("archive.path is required for archive.kind = {:?}", self.kind));
                }
            }
            ArchiveKind::ObjectStore => {
                if self.bucket.is_none() {
                    errors.push("archive.bucket is required for archive.kind = object-store".to_owned());
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_backend_requires_path() {
        let cfg = ArchiveConfig {
            kind: ArchiveKind::Fs,
            path: None,
            bucket: None,
            endpoint: None,
            region: None,
            upload_buffer_size: None,
            disabled: false,
        };
        assert_eq!(cfg.check().len(), 1);
    }

    #[test]
    fn disabled_backend_skips_checks() {
        let cfg = ArchiveConfig {
            kind: ArchiveKind::ObjectStore,
            path: None,
            bucket: None,
            endpoint: None,
            region: None,
            upload_buffer_size: None,
            disabled: true,
        };
        assert!(cfg.check().is_empty());
    }

    #[test]
    fn object_store_backend_requires_bucket() {
        let cfg = ArchiveConfig {
            kind: ArchiveKind::ObjectStore,
            path: None,
            bucket: Some("hpcmetrics-archive".into()),
            endpoint: None,
            region: None,
            upload_buffer_size: None,
            disabled: false,
        };
        assert!(cfg.check().is_empty());
    }
}
