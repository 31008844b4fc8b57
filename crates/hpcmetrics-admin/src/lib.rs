// SPDX-License-Identifier: Apache-2.0

//! The admin HTTP surface: `GET /healthz` for liveness and `GET /metrics` for the self-metrics
//! registry. Kept deliberately small — job/node data is served by the front-end API, not here.

pub mod error;
mod health;
mod metrics;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use hpcmetrics_telemetry::SelfMetrics;
use tokio::net::TcpListener;

pub use error::Error;
pub use health::HealthResponse;

/// Shared state behind every admin route.
pub struct AdminState {
    metrics: Arc<SelfMetrics>,
}

/// Builds the admin router over `metrics`.
#[must_use]
pub fn router(metrics: Arc<SelfMetrics>) -> Router {
    let state = Arc::new(AdminState { metrics });
    Router::new().route("/healthz", get(health::healthz)).route("/metrics", get(metrics::metrics)).with_state(state)
}

/// Binds `bind_address` and serves the admin router until the process is asked to shut down.
///
/// # Errors
///
/// Returns [`Error::InvalidBindAddress`] if `bind_address` does not parse, or
/// [`Error::BindFailed`] if the listener cannot be bound.
pub async fn serve(bind_address: &str, metrics: Arc<SelfMetrics>) -> Result<(), Error> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|source: std::net::AddrParseError| Error::InvalidBindAddress {
            bind_address: bind_address.to_owned(),
            details: source.to_string(),
        })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::BindFailed { addr: addr.to_string(), details: source.to_string() })?;

    tracing::info!(%addr, "admin HTTP server listening");

    axum::serve(listener, router(metrics))
        .await
        .map_err(|source| Error::ServerError { addr: addr.to_string(), details: source.to_string() })
}
