// SPDX-License-Identifier: Apache-2.0

//! Offline schema-migration walker for archived `meta.json` documents.
//!
//! Walks an archive root, locates every `meta.json`, and applies a fixed, idempotent
//! transformation pipeline ([`pipeline::migrate`]) across a configurable worker pool
//! ([`run::run`]). A single file's failure is logged and counted, never fatal to the run; the
//! process exit code is non-zero iff at least one file failed ([`run::RunSummary::exit_code`]).

pub mod error;
pub mod pipeline;
pub mod run;
mod walk;

pub use error::{FileError, MigrateError};
pub use run::{run, RunOptions, RunSummary};
pub use walk::find_meta_files;
