// SPDX-License-Identifier: Apache-2.0

//! `GET /healthz`: a liveness probe, not a deep health check — it reports whether the process is
//! accepting requests, not whether every monitored node is reporting fresh data. Per-subtree
//! staleness is a `hpcmetrics-store::MetricStore::health` concern surfaced through self-metrics
//! and the regular metric API instead.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AdminState;

/// Response body for `GET /healthz`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`; the handler only runs once the process has finished starting up.
    pub status: &'static str,
}

pub(crate) async fn healthz(State(_state): State<Arc<AdminState>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_as_expected() {
        let body = serde_json::to_string(&HealthResponse { status: "ok" }).expect("serialize");
        assert_eq!(body, r#"{"status":"ok"}"#);
    }
}
