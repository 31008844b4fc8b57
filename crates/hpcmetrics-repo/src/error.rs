// SPDX-License-Identifier: Apache-2.0

//! Repository error taxonomy.

/// Error returned by a repository operation.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// No record exists for the given key.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backing store reported a failure (connection, constraint violation, etc.).
    #[error("repository backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
