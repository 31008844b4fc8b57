// SPDX-License-Identifier: Apache-2.0

//! `GET /metrics`: Prometheus text-exposition-format self-metrics.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::AdminState;

pub(crate) async fn metrics(State(state): State<Arc<AdminState>>) -> Response {
    match state.metrics.gather() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode self-metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}
