// SPDX-License-Identifier: Apache-2.0

//! Errors for the worker crate.

use miette::Diagnostic;

/// Errors that can occur when spawning or joining a dedicated-thread task.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// Failed to spawn an OS thread.
    #[error("Failed to spawn thread '{thread_name}': {source}")]
    ThreadSpawnError {
        /// Name of the thread we attempted to spawn.
        thread_name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Thread panic error identified by thread name.
    #[error("Thread '{thread_name}' panicked: {panic_message}")]
    ThreadJoinPanic {
        /// The thread name that panicked.
        thread_name: String,
        /// Panic message.
        panic_message: String,
    },
}
