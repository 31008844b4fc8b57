// SPDX-License-Identifier: Apache-2.0

//! Drives the migration pipeline over every discovered `meta.json`, fanned out across a
//! configurable worker pool. A single file failing to parse or rewrite is logged and counted; it
//! never aborts the run, per the documented failure model.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::error::{FileError, MigrateError};
use crate::pipeline;
use crate::walk::find_meta_files;

/// How often (in files processed) a progress counter is logged.
const DEFAULT_PROGRESS_INTERVAL: usize = 500;

/// Parameters for [`run`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Number of worker threads draining the path queue.
    pub workers: usize,
    /// When set, files are parsed and the pipeline is applied, but nothing is written back.
    pub dry_run: bool,
    /// Log a progress counter every this many files processed. `0` disables progress logging.
    pub progress_interval: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions { workers: 4, dry_run: false, progress_interval: DEFAULT_PROGRESS_INTERVAL }
    }
}

/// End-of-run summary, logged by the caller and used to pick the process exit code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Total `meta.json` files discovered under the root.
    pub total: usize,
    /// Files the pipeline changed (and, unless `dry_run`, rewrote).
    pub migrated: usize,
    /// Files already at the current schema; left alone.
    pub unchanged: usize,
    /// Files that failed to read, parse, or write. Each is logged individually at the time it
    /// occurs; this is just the count.
    pub failed: usize,
}

impl RunSummary {
    /// The migration tool's exit-code contract: non-zero iff at least one file failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed > 0)
    }
}

/// Outcome of migrating one file, reported back to the coordinator thread over a result channel.
enum FileOutcome {
    Migrated,
    Unchanged,
    Failed,
}

/// Walks `root` for every `meta.json`, then migrates each one across `options.workers` threads.
///
/// # Errors
///
/// Returns [`MigrateError`] if `root` cannot be walked at all; individual file failures are
/// folded into the returned [`RunSummary`] instead.
pub fn run(root: &Path, options: RunOptions) -> Result<RunSummary, MigrateError> {
    let paths = find_meta_files(root)?;
    let total = paths.len();
    tracing::info!(total, root = %root.display(), "discovered meta.json files");

    let (path_tx, path_rx) = mpsc::channel::<PathBuf>();
    for path in paths {
        path_tx.send(path).expect("receiver outlives every send on this channel");
    }
    drop(path_tx);
    let path_rx = Arc::new(Mutex::new(path_rx));

    let migrated = Arc::new(AtomicUsize::new(0));
    let unchanged = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let processed = Arc::new(AtomicUsize::new(0));

    let worker_count = options.workers.max(1);
    std::thread::scope(|scope| {
        for worker_id in 0..worker_count {
            let path_rx = Arc::clone(&path_rx);
            let migrated = Arc::clone(&migrated);
            let unchanged = Arc::clone(&unchanged);
            let failed = Arc::clone(&failed);
            let processed = Arc::clone(&processed);
            let _ = scope.spawn(move || {
                worker_loop(
                    worker_id,
                    &path_rx,
                    options,
                    total,
                    &migrated,
                    &unchanged,
                    &failed,
                    &processed,
                );
            });
        }
    });

    let summary = RunSummary {
        total,
        migrated: migrated.load(Ordering::Relaxed),
        unchanged: unchanged.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
    };
    tracing::info!(
        total = summary.total,
        migrated = summary.migrated,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "migration run complete"
    );
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    path_rx: &Mutex<mpsc::Receiver<PathBuf>>,
    options: RunOptions,
    total: usize,
    migrated: &AtomicUsize,
    unchanged: &AtomicUsize,
    failed: &AtomicUsize,
    processed: &AtomicUsize,
) {
    loop {
        let path = {
            let rx = path_rx.lock().expect("path queue mutex poisoned");
            rx.recv()
        };
        let Ok(path) = path else { break };

        match migrate_one(&path, options.dry_run) {
            Ok(FileOutcome::Migrated) => {
                let _ = migrated.fetch_add(1, Ordering::Relaxed);
            }
            Ok(FileOutcome::Unchanged) => {
                let _ = unchanged.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                let _ = failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(path = %path.display(), error = %e, "failed to migrate file");
            }
        }

        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if options.progress_interval > 0 && done % options.progress_interval == 0 {
            tracing::info!(worker_id, done, total, "migration progress");
        }
    }
}

/// Reads, migrates, and (unless `dry_run`) rewrites one `meta.json` document.
///
/// # Errors
///
/// Returns [`FileError`] if the file cannot be read, does not parse as a JSON object, or (when
/// writing is not skipped) cannot be written back.
fn migrate_one(path: &Path, dry_run: bool) -> Result<FileOutcome, FileError> {
    let contents = std::fs::read_to_string(path).map_err(FileError::Read)?;
    let mut doc: serde_json::Value = serde_json::from_str(&contents).map_err(FileError::Parse)?;
    if !doc.is_object() {
        return Err(FileError::NotAnObject);
    }

    if !pipeline::migrate(&mut doc) {
        return Ok(FileOutcome::Unchanged);
    }

    if !dry_run {
        let rendered = serde_json::to_string_pretty(&doc).expect("a migrated JSON object always re-serializes");
        std::fs::write(path, rendered).map_err(FileError::Write)?;
    }
    Ok(FileOutcome::Migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_job(dir: &Path, job_id: &str, contents: &str) -> PathBuf {
        let job_dir = dir.join(job_id);
        std::fs::create_dir_all(&job_dir).unwrap();
        let path = job_dir.join("meta.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn migrates_every_file_and_reports_a_summary() {
        let dir = tempfile::tempdir().unwrap();
        let _ = write_job(dir.path(), "a", r#"{"exclusive": 2, "startTime": 1}"#);
        let _ = write_job(dir.path(), "b", r#"{"shared": "none", "submitTime": 1, "startTime": 1, "energy": 0, "requestedMemory": 0}"#);
        let _ = write_job(dir.path(), "c", "not json");

        let summary = run(dir.path(), RunOptions { workers: 2, dry_run: false, progress_interval: 0 }).unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.migrated, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn dry_run_does_not_write_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(dir.path(), "a", r#"{"exclusive": 1, "startTime": 1}"#);

        let summary = run(dir.path(), RunOptions { workers: 1, dry_run: true, progress_interval: 0 }).unwrap();
        assert_eq!(summary.migrated, 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"exclusive\""), "dry run must not rewrite the file");
    }

    #[test]
    fn second_run_over_the_same_archive_is_a_pure_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let _ = write_job(dir.path(), "a", r#"{"exclusive": 2, "flops_any_avg": 1.23, "startTime": 1}"#);

        let first = run(dir.path(), RunOptions { workers: 1, dry_run: false, progress_interval: 0 }).unwrap();
        assert_eq!(first.migrated, 1);

        let second = run(dir.path(), RunOptions { workers: 1, dry_run: false, progress_interval: 0 }).unwrap();
        assert_eq!(second.migrated, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.failed, 0);
    }

    #[test]
    fn empty_archive_yields_an_all_zero_summary() {
        let dir = tempfile::tempdir().unwrap();
        let summary = run(dir.path(), RunOptions::default()).unwrap();
        assert_eq!(summary, RunSummary::default());
    }
}
