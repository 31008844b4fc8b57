// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the schema-migration walker.

use miette::Diagnostic;
use std::path::PathBuf;

/// Errors that abort the whole run, as opposed to a single file's migration failing (which is
/// logged and counted, never fatal to the run — see [`crate::pipeline::FileOutcome`]).
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum MigrateError {
    /// `root` does not exist or is not a directory.
    #[error("archive root '{root}' is not a readable directory")]
    InvalidRoot {
        /// The path that failed the check.
        root: PathBuf,
    },

    /// The directory walk itself failed (permissions, a symlink cycle `walkdir` detected, etc.),
    /// distinct from an individual file failing to parse or rewrite.
    #[error("failed to walk '{root}': {source}")]
    Walk {
        /// Root the walk started from.
        root: PathBuf,
        /// Underlying `walkdir` error.
        #[source]
        source: walkdir::Error,
    },
}

/// Why migrating a single `meta.json` file failed. Collected per-file; never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The file could not be read.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    /// The file's contents were not a JSON object.
    #[error("not a JSON object")]
    NotAnObject,
    /// The file did not parse as JSON at all.
    #[error("invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    /// The migrated document could not be written back.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
}
