// SPDX-License-Identifier: Apache-2.0

//! Error types for the write and read paths.

/// Why a single sample in a write or batch-write failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WriteError {
    /// The sample's timestamp was older than the chain's current write head.
    #[error("sample for {path} at {timestamp} is out of order")]
    OutOfOrder {
        /// A rendering of the path the sample targeted, for diagnostics.
        path: String,
        /// The rejected sample's timestamp.
        timestamp: i64,
    },
    /// The metric name has not been registered for this cluster.
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
}

/// The outcome of a batch write: every sample is attempted, never short-circuited.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteOutcome {
    /// Number of samples written successfully.
    pub accepted: usize,
    /// Number of samples rejected, with their errors.
    pub rejected: Vec<WriteError>,
}

impl BatchWriteOutcome {
    /// The first rejection, if any, for callers that only need a headline error.
    #[must_use]
    pub fn first_error(&self) -> Option<&WriteError> {
        self.rejected.first()
    }
}

/// Why a read could not be completed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReadError {
    /// No Level exists for the requested path.
    #[error("unknown path: {0}")]
    UnknownPath(String),
    /// The read was cancelled before completion.
    #[error("read cancelled")]
    Cancelled,
}
