// SPDX-License-Identifier: Apache-2.0

//! Dispatcher error taxonomy.

/// Error returned by a dispatcher operation.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The live store rejected the read (unknown path).
    #[error(transparent)]
    Store(#[from] hpcmetrics_store::ReadError),
    /// The archive backend rejected the read.
    #[error(transparent)]
    Archive(#[from] hpcmetrics_archive::ArchiveError),
    /// The read was cancelled before completion.
    #[error("dispatch cancelled")]
    Cancelled,
}
