// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for loading and validating the configuration document.

use miette::Diagnostic;

/// Error produced while loading or validating the configuration.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration file could not be read from disk.
    #[error("failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file extension did not map to a supported format.
    #[error("unsupported configuration file extension: {0} (expected .yaml, .yml, or .json)")]
    UnsupportedExtension(String),

    /// The document failed to deserialize, usually an unknown key under `deny_unknown_fields`
    /// or a type mismatch.
    #[error("{format} deserialization error: {details}")]
    Deserialize {
        /// `"YAML"` or `"JSON"`.
        format: &'static str,
        /// The underlying parser's message.
        details: String,
    },

    /// One or more cross-field validation rules failed. Carries every violation found in a
    /// single pass rather than just the first, so an operator can fix a config in one round trip.
    #[error("invalid configuration: {}", .errors.join("; "))]
    Invalid {
        /// Every validation failure found.
        errors: Vec<String>,
    },
}
