// SPDX-License-Identifier: Apache-2.0

//! Runs a single `!Send` async task on its own dedicated OS thread.
//!
//! The archiver pipeline (`hpcmetrics-archiver`) needs exactly one long-running worker that owns
//! the backend connection and drains a trigger queue serially. [`thread_task::spawn_thread_local_task`]
//! gives it a single-threaded Tokio runtime plus [`tokio_util::sync::CancellationToken`]-driven
//! shutdown, without pulling the whole work onto the shared multi-threaded runtime.

pub mod error;
pub mod thread_task;
