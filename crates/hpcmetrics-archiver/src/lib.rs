// SPDX-License-Identifier: Apache-2.0

//! The archiver pipeline: a single dedicated-thread worker that drains a bounded trigger queue,
//! re-fetches each finished job's record, computes its footprint statistics, persists it through
//! an [`hpcmetrics_archive::ArchiveBackend`], and commits the updated job row.
//!
//! Archiving is I/O-bound on the backend, so a single worker is deliberate: it avoids
//! overwhelming an object-store connection pool, and backpressure comes for free from the
//! bounded channel. The worker runs on its own OS thread with a single-threaded Tokio runtime
//! (`hpcmetrics_worker::thread_task::spawn_thread_local_task`) so its blocking archive I/O never
//! competes with the shared multi-threaded runtime serving HTTP requests.
//!
//! There are no automatic retries: a job that fails to archive is left with monitoring-status
//! `archiving-failed`, and an operator re-triggers it by filtering on that status.

mod error;
mod job;
mod options;
mod pipeline;

pub use error::ArchiverError;
pub use job::ArchiveJob;
pub use options::{ArchiverOptions, StopHook, DEFAULT_CHANNEL_CAPACITY};

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use hpcmetrics_archive::ArchiveBackend;
use hpcmetrics_dispatch::MetricDispatcher;
use hpcmetrics_repo::JobRepository;
use hpcmetrics_telemetry::SelfMetrics;
use hpcmetrics_worker::thread_task::{spawn_thread_local_task, ThreadLocalTaskHandle};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

type WorkerHandle = ThreadLocalTaskHandle<(), std::convert::Infallible>;

/// Handle to the running archiver pipeline.
pub struct Archiver {
    sender: AsyncMutex<Option<mpsc::Sender<ArchiveJob>>>,
    telemetry: Arc<SelfMetrics>,
    worker: StdMutex<Option<WorkerHandle>>,
}

impl Archiver {
    /// Spawns the archiver's dedicated worker thread. Idempotent to call once per process; call
    /// it again only after a prior instance has been dropped or shut down.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::Spawn`] if the dedicated OS thread could not be created.
    pub fn start(
        job_repository: Arc<dyn JobRepository>,
        dispatcher: Arc<MetricDispatcher>,
        archive: Arc<dyn ArchiveBackend>,
        telemetry: Arc<SelfMetrics>,
        options: ArchiverOptions,
    ) -> Result<Self, ArchiverError> {
        let (sender, receiver) = mpsc::channel(options.channel_capacity);
        let archive_disabled = options.archive_disabled;
        let metrics = options.metrics;
        let stop_hooks = options.stop_hooks;
        let telemetry_for_worker = Arc::clone(&telemetry);

        let worker = spawn_thread_local_task("hpcmetrics-archiver", move |cancel| async move {
            run(receiver, job_repository, dispatcher, archive, archive_disabled, metrics, stop_hooks, telemetry_for_worker, cancel)
                .await;
            Ok::<(), std::convert::Infallible>(())
        })?;

        Ok(Archiver { sender: AsyncMutex::new(Some(sender)), telemetry, worker: StdMutex::new(Some(worker)) })
    }

    /// Queues `job` for archiving. Non-blocking unless the channel is at capacity, in which case
    /// it waits for room. Increments the pending-jobs gauge immediately; the worker decrements it
    /// once the job finishes (successfully, with a recorded failure, or archiving disabled).
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::Closed`] if `shutdown` has already been called.
    pub async fn trigger_archiving(&self, job: ArchiveJob) -> Result<(), ArchiverError> {
        let sender = { self.sender.lock().await.clone() };
        let Some(sender) = sender else { return Err(ArchiverError::Closed) };

        self.telemetry.archiver_pending.inc();
        if sender.send(job).await.is_err() {
            self.telemetry.archiver_pending.dec();
            return Err(ArchiverError::Closed);
        }
        Ok(())
    }

    /// Closes the trigger queue, waits up to `timeout` for already-queued jobs to finish, then
    /// cancels the worker's context (aborting whatever archival is still in flight) and joins its
    /// thread.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiverError::Spawn`] if the worker thread panicked.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ArchiverError> {
        {
            let mut guard = self.sender.lock().await;
            *guard = None;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        while self.telemetry.archiver_pending.get() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let worker = {
            let mut guard = self.worker.lock().expect("archiver worker mutex poisoned");
            guard.take()
        };
        if let Some(worker) = worker {
            tokio::task::spawn_blocking(move || worker.shutdown_and_join())
                .await
                .map_err(|_| ArchiverError::Closed)?
                .map_err(ArchiverError::Spawn)?;
        }
        Ok(())
    }

    /// Number of jobs queued or being processed right now.
    #[must_use]
    pub fn pending(&self) -> i64 {
        self.telemetry.archiver_pending.get()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    mut receiver: mpsc::Receiver<ArchiveJob>,
    job_repository: Arc<dyn JobRepository>,
    dispatcher: Arc<MetricDispatcher>,
    archive: Arc<dyn ArchiveBackend>,
    archive_disabled: bool,
    metrics: Vec<String>,
    stop_hooks: Vec<StopHook>,
    telemetry: Arc<SelfMetrics>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            maybe_job = receiver.recv() => {
                let Some(job) = maybe_job else { break };
                pipeline::archive_one(
                    &job,
                    job_repository.as_ref(),
                    dispatcher.as_ref(),
                    archive.as_ref(),
                    archive_disabled,
                    &metrics,
                    &stop_hooks,
                    &telemetry,
                    &cancel,
                )
                .await;
            }
        }
    }
}
