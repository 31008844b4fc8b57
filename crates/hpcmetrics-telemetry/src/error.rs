// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the telemetry crate.

use miette::Diagnostic;

/// Errors raised while setting up logging or exposing metrics.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum TelemetryError {
    /// A `RUST_LOG`-style filter directive string did not parse.
    #[error("invalid log filter '{directive}': {details}")]
    InvalidFilter {
        /// The directive string that failed to parse.
        directive: String,
        /// The underlying parser's message.
        details: String,
    },

    /// The global `tracing` subscriber was already installed.
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,

    /// A Prometheus collector could not be registered, usually a duplicate metric name.
    #[error("failed to register metric '{name}': {source}")]
    RegistrationFailed {
        /// The metric that failed to register.
        name: &'static str,
        /// The underlying Prometheus error.
        #[source]
        source: prometheus::Error,
    },

    /// Rendering the registry to the Prometheus text exposition format failed.
    #[error("failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),
}
