// SPDX-License-Identifier: Apache-2.0

//! `hpcmetricsd`: the control-plane server process.
//!
//! Boots the metric store, an archive backend selected by configuration, the dispatcher that
//! routes reads between them, and the archiver pipeline, then serves the ingestion front door and
//! the admin HTTP surface until asked to shut down. Job/cluster persistence is left to the
//! in-memory repository test doubles: the real SQL-backed implementation, the GraphQL resolvers,
//! and the scheduler adapters that would seed these repositories are all out of scope for this
//! binary (see the data-plane specification's Non-goals).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hpcmetrics_admin as admin;
use hpcmetrics_archive::{local_filesystem, ArchiveBackend, NullBackend, SledBackend};
use hpcmetrics_archiver::{Archiver, ArchiverOptions};
use hpcmetrics_config::{ArchiveKind, Config};
use hpcmetrics_dispatch::MetricDispatcher;
use hpcmetrics_ingest::{write_batch, IngestState};
use hpcmetrics_repo::InMemoryJobRepository;
use hpcmetrics_store::MetricStore;
use hpcmetrics_telemetry::SelfMetrics;
use tokio_util::sync::CancellationToken;

#[cfg(all(not(windows), feature = "jemalloc"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Control plane for an HPC job-monitoring platform.
#[derive(Debug, Parser)]
#[command(name = "hpcmetricsd", version, about)]
struct Cli {
    /// Path to the YAML or JSON configuration document.
    #[arg(long, default_value = "hpcmetrics.yaml")]
    config: PathBuf,

    /// Soft byte budget for the dispatcher's result cache.
    #[arg(long, default_value_t = 64 * 1024 * 1024)]
    cache_budget: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = hpcmetrics_telemetry::logging::init("info") {
        tracing::error!(error = %e, "failed to initialize logging, continuing without structured output");
    }

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, path = %cli.config.display(), "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "configuration failed validation");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(config, cli.cache_budget))
}

async fn run(config: Config, cache_budget: usize) -> ExitCode {
    let telemetry = match SelfMetrics::new() {
        Ok(telemetry) => Arc::new(telemetry),
        Err(e) => {
            tracing::error!(error = %e, "failed to build self-metrics registry");
            return ExitCode::FAILURE;
        }
    };

    let archive: Arc<dyn ArchiveBackend> = match build_archive_backend(&config) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, "failed to construct archive backend");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(MetricStore::new());
    let dispatcher =
        Arc::new(MetricDispatcher::new(Arc::clone(&store), Arc::clone(&archive), cache_budget, !config.archive.disabled));

    // The job/cluster repositories' real SQL-backed implementation, and the scheduler adapters
    // and GraphQL resolvers that would seed and query them, are out of scope here; this binary
    // only needs a `JobRepository` to hand the archiver.
    let job_repository = Arc::new(InMemoryJobRepository::new());

    let archiver_options = ArchiverOptions {
        channel_capacity: hpcmetrics_archiver::DEFAULT_CHANNEL_CAPACITY,
        metrics: all_metric_names(&config),
        archive_disabled: config.archive.disabled,
        stop_hooks: Vec::new(),
    };
    let archiver = match Archiver::start(
        job_repository,
        Arc::clone(&dispatcher),
        Arc::clone(&archive),
        Arc::clone(&telemetry),
        archiver_options,
    ) {
        Ok(archiver) => Arc::new(archiver),
        Err(e) => {
            tracing::error!(error = %e, "failed to start archiver pipeline");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();

    let retention_config = hpcmetrics_store::retention::RetentionConfig {
        interval: config.cleanup.interval,
        mode: match config.cleanup.mode {
            hpcmetrics_config::CleanupMode::Delete => hpcmetrics_store::retention::CleanupMode::Delete,
            hpcmetrics_config::CleanupMode::Archive => hpcmetrics_store::retention::CleanupMode::Archive,
        },
        default_retention_secs: config.cleanup.default_retention.as_secs() as i64,
        cluster_overrides: config
            .cleanup
            .cluster_overrides
            .iter()
            .map(|(cluster, duration)| (cluster.clone(), duration.0.as_secs() as i64))
            .collect(),
    };
    let retention_worker =
        hpcmetrics_store::retention::spawn(Arc::clone(&store), config.clusters.clone(), retention_config, shutdown.clone());

    let memory_gauge = Arc::new(hpcmetrics_store::memory::MemoryGauge::default());
    let memory_worker =
        hpcmetrics_store::memory::spawn(Arc::clone(&store), Arc::clone(&memory_gauge), Duration::from_secs(30), shutdown.clone());

    let ingest_state = Arc::new(IngestState { store: Arc::clone(&store) });
    let ingest_router = axum::Router::new().route("/write", axum::routing::post(write_batch)).with_state(ingest_state);

    let ingestion_bind = config.ingestion.bind_address.clone();
    let ingestion_server = tokio::spawn(async move {
        match tokio::net::TcpListener::bind(&ingestion_bind).await {
            Ok(listener) => {
                tracing::info!(addr = %ingestion_bind, "ingestion HTTP server listening");
                if let Err(e) = axum::serve(listener, ingest_router).await {
                    tracing::error!(error = %e, "ingestion HTTP server stopped unexpectedly");
                }
            }
            Err(e) => tracing::error!(error = %e, addr = %ingestion_bind, "failed to bind ingestion HTTP server"),
        }
    });

    let admin_bind = config.admin.bind_address.clone();
    let admin_telemetry = Arc::clone(&telemetry);
    let admin_server = tokio::spawn(async move {
        if let Err(e) = admin::serve(&admin_bind, admin_telemetry).await {
            tracing::error!(error = %e, "admin HTTP server stopped unexpectedly");
        }
    });

    tracing::info!(clusters = ?config.clusters, "hpcmetricsd started");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler, shutting down immediately");
    } else {
        tracing::info!("shutdown signal received");
    }

    shutdown.cancel();
    ingestion_server.abort();
    admin_server.abort();
    retention_worker.abort();
    memory_worker.abort();

    if let Err(e) = archiver.shutdown(Duration::from_secs(30)).await {
        tracing::error!(error = %e, "archiver pipeline did not shut down cleanly");
    }

    ExitCode::SUCCESS
}

/// Builds the configured archive backend. `object-store` requires a remote-store feature
/// (`object_store`'s `aws`/`gcp`/`azure`) this binary is not compiled with; `fs` and
/// `embedded-kv` are always available.
fn build_archive_backend(config: &Config) -> Result<Arc<dyn ArchiveBackend>, String> {
    if config.archive.disabled {
        return Ok(Arc::new(NullBackend));
    }

    match config.archive.kind {
        ArchiveKind::Fs => {
            let path = config.archive.path.as_deref().ok_or("archive.path is required for archive.kind = fs")?;
            let backend = local_filesystem(std::path::Path::new(path)).map_err(|e| e.to_string())?;
            Ok(Arc::new(backend))
        }
        ArchiveKind::EmbeddedKv => {
            let path =
                config.archive.path.as_deref().ok_or("archive.path is required for archive.kind = embedded-kv")?;
            let backend = SledBackend::open(std::path::Path::new(path)).map_err(|e| e.to_string())?;
            Ok(Arc::new(backend))
        }
        ArchiveKind::ObjectStore => Err(
            "archive.kind = object-store requires rebuilding with an object_store remote-store \
             feature (aws/gcp/azure); this build only links the fs feature"
                .to_owned(),
        ),
    }
}

/// Every metric name referenced anywhere in the configured metric lists, deduplicated, used to
/// seed the archiver's candidate metric set.
fn all_metric_names(config: &Config) -> Vec<String> {
    let mut names: Vec<String> = config
        .metric_config
        .job_list_metrics
        .iter()
        .chain(config.metric_config.job_view_plot_metrics.iter())
        .chain(config.metric_config.job_view_table_metrics.iter())
        .cloned()
        .collect();
    names.sort();
    names.dedup();
    names
}
