// SPDX-License-Identifier: Apache-2.0

//! The batch write HTTP endpoint: accepts newline-delimited samples, writes every parseable one.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hpcmetrics_store::MetricStore;
use serde::Serialize;

use crate::line::parse_line;

/// Response body for a batch write, matching the wire contract exactly:
/// `(accepted, rejected, first_error)`.
#[derive(Debug, Serialize)]
pub struct BatchResult {
    /// Number of lines successfully parsed and written.
    pub accepted: usize,
    /// Number of lines rejected, whether at parse time or write time.
    pub rejected: usize,
    /// The first error encountered, if any, rendered as a string.
    pub first_error: Option<String>,
}

/// Shared state the batch-write handler needs.
pub struct IngestState {
    /// The metric store writes land in.
    pub store: Arc<MetricStore>,
}

/// `POST /write`: body is newline-delimited line-protocol samples.
pub async fn write_batch(State(state): State<Arc<IngestState>>, body: String) -> impl IntoResponse {
    let mut accepted = 0usize;
    let mut rejected = 0usize;
    let mut first_error = None;

    for line in body.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(sample) => match state.store.write(&sample.path, &sample.metric, sample.timestamp, sample.value) {
                Ok(()) => accepted += 1,
                Err(e) => {
                    rejected += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
            },
            Err(e) => {
                rejected += 1;
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    (StatusCode::OK, Json(BatchResult { accepted, rejected, first_error }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_valid_lines_and_counts_rejects() {
        let store = Arc::new(MetricStore::new());
        store.register_metric("flops_any", 10);
        let state = Arc::new(IngestState { store: Arc::clone(&store) });

        let body = "flops_any,cluster=fritz,hostname=f0001,type=node value=1 0\n\
                     flops_any,cluster=fritz,hostname=f0001,type=node value=oops 10\n"
            .to_owned();

        let response = write_batch(State(state), body).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
