// SPDX-License-Identifier: Apache-2.0

//! Structured logging setup and a self-metrics registry shared across the control plane's
//! components.
//!
//! [`logging::init`] installs the process-wide `tracing` subscriber. [`metrics::SelfMetrics`] is
//! constructed once at startup and handed to the store, cache, dispatcher, and archiver so each
//! can report its own health without those crates depending on `hpcmetrics-admin`.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use metrics::SelfMetrics;
