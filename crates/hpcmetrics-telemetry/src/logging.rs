// SPDX-License-Identifier: Apache-2.0

//! Process-wide structured logging setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::TelemetryError;

/// Installs the global `tracing` subscriber: JSON-free human-readable formatting to stdout, with
/// the level filter taken from `RUST_LOG` and falling back to `default_filter` (e.g. `"info"`)
/// when unset or unparsable.
///
/// # Errors
///
/// Returns [`TelemetryError::SubscriberAlreadySet`] if a global subscriber is already installed,
/// which only happens if this is called more than once per process.
pub fn init(default_filter: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .try_init()
        .map_err(|_| TelemetryError::SubscriberAlreadySet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_accepted() {
        // EnvFilter::new panics on malformed input rather than returning a Result, so this just
        // confirms the literal we ship as a fallback is well-formed.
        let _ = EnvFilter::new("info");
    }
}
