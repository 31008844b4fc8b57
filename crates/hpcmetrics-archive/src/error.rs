// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for archive backend operations.

/// Classification of an [`ArchiveError`], for metrics and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorKind {
    /// The requested job or cluster configuration does not exist in the backend.
    NotFound,
    /// The underlying storage medium (disk, object store, sled) reported a failure.
    Storage,
    /// A document existed but could not be decoded (corrupt JSON, bad gzip stream).
    Codec,
}

/// Error returned by any [`crate::backend::ArchiveBackend`] operation.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// No entry exists at the requested address.
    #[error("archive entry not found: {0}")]
    NotFound(String),
    /// The backing store reported an I/O or network failure.
    #[error("archive storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A document failed to (de)serialize.
    #[error("archive codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ArchiveError {
    /// This error's classification.
    #[must_use]
    pub fn kind(&self) -> ArchiveErrorKind {
        match self {
            ArchiveError::NotFound(_) => ArchiveErrorKind::NotFound,
            ArchiveError::Storage(_) => ArchiveErrorKind::Storage,
            ArchiveError::Codec(_) => ArchiveErrorKind::Codec,
        }
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(e: serde_json::Error) -> Self {
        ArchiveError::Codec(Box::new(e))
    }
}

impl From<object_store::Error> for ArchiveError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => ArchiveError::NotFound(path),
            other => ArchiveError::Storage(Box::new(other)),
        }
    }
}

impl From<sled::Error> for ArchiveError {
    fn from(e: sled::Error) -> Self {
        ArchiveError::Storage(Box::new(e))
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        ArchiveError::Storage(Box::new(e))
    }
}
