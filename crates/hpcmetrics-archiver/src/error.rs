// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the archiver pipeline.

use miette::Diagnostic;

/// Error returned by the archiver's public operations. Per-job failures during the worker loop
/// are not surfaced here; they are recorded on the job row itself (`monitoring-status:
/// archiving-failed`) per the no-automatic-retry failure model.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ArchiverError {
    /// The dedicated worker thread could not be spawned.
    #[error(transparent)]
    Spawn(#[from] hpcmetrics_worker::error::Error),

    /// `trigger_archiving` was called after the worker's channel was closed, i.e. after
    /// `shutdown` began.
    #[error("archiver is shutting down, job was not queued")]
    Closed,
}
